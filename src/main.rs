use dioxus::prelude::*;

mod components;
mod db;
mod sounds;

fn main() {
    if let Err(err) = dioxus::logger::init(tracing::Level::INFO) {
        eprintln!("failed to initialize logger: {err}");
    }
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Title { "SoundCue" }
        document::Meta { name: "theme-color", content: "#10b981" }

        components::AppShell {}
    }
}
