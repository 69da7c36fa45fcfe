use std::collections::HashMap;

use crate::checks::CheckSession;
use crate::core::config::CheckConfig;
use crate::core::model::Document;
use crate::core::report::Category;

/// Characters painted per font name, over pages still in play.
pub fn tally_fonts(doc: &Document, session: &mut CheckSession) -> HashMap<String, usize> {
    let mut fonts: HashMap<String, usize> = HashMap::new();
    for page in &doc.pages {
        if session.is_excluded(page.number) {
            continue;
        }
        match &page.content {
            Ok(content) => {
                for ch in &content.chars {
                    *fonts.entry(ch.fontname.clone()).or_default() += 1;
                }
            }
            Err(_) => session.add(Category::Font, format!("Can't parse page #{}", page.number)),
        }
    }
    fonts
}

/// Most used font, ties broken by the greater name.
pub fn dominant_font(fonts: &HashMap<String, usize>) -> Option<(&str, usize)> {
    fonts
        .iter()
        .map(|(name, count)| (*count, name.as_str()))
        .max()
        .map(|(count, name)| (name, count))
}

pub fn check_font(doc: &Document, config: &CheckConfig, session: &mut CheckSession) {
    let fonts = tally_fonts(doc, session);
    let total: usize = fonts.values().sum();
    let Some((name, count)) = dominant_font(&fonts) else {
        session.add(Category::Font, "Can't find the main font");
        return;
    };

    if (count as f64) / (total as f64) < config.main_font_ratio {
        session.add(Category::Font, "Can't find the main font");
    }
    if !config.allowed_fonts.iter().any(|allowed| name.ends_with(allowed.as_str())) {
        session.add(
            Category::Font,
            format!(
                "Wrong font. The main font used is {name} when it should be a font in {:?}.",
                config.allowed_fonts
            ),
        );
    }
}
