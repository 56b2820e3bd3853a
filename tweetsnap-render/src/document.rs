use maud::{DOCTYPE, PreEscaped, html};

#[must_use]
pub fn compose_document(stylesheet: &str, embed: &str) -> String {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                style { (PreEscaped(stylesheet)) }
            }
            body style="margin: 0; background: white;" {
                (PreEscaped(embed))
            }
        }
    }
    .into_string()
}
