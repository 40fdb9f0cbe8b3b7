//! Pulls unsubscribe links out of raw messages.

use mail_parser::{Message, MessageParser, PartType};
use scraper::{Html, Selector};

use crate::error::{PlungerError, Result};
use crate::traits::Email;

const UNSUBSCRIBE_TOKEN: &str = "unsubscribe";

/// Decode one raw message and collect unsubscribe links from every `text/html` part.
///
/// Links come back in document order, duplicates included.
pub fn extract_from_message(email: &Email) -> Result<Vec<String>> {
    let message = MessageParser::default()
        .parse(email.content.as_slice())
        .ok_or_else(|| PlungerError::Decode {
            id: email.id.clone(),
            reason: "not a parseable MIME message".to_string(),
        })?;

    let mut links = Vec::new();
    collect_html_links(&message, &mut links);
    Ok(links)
}

// mail-parser tags a part as Html only when its declared type is text/html,
// for single-part messages as well as multipart ones.
fn collect_html_links(message: &Message<'_>, links: &mut Vec<String>) {
    for part in &message.parts {
        match &part.body {
            PartType::Html(html) => links.extend(extract_from_html(html)),
            PartType::Message(nested) => collect_html_links(nested, links),
            _ => {}
        }
    }
}

/// Every `<a href>` whose lowercased value contains "unsubscribe".
pub fn extract_from_html(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| href.to_lowercase().contains(UNSUBSCRIBE_TOKEN))
        .map(str::to_string)
        .collect()
}
