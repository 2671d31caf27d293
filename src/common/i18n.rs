// src/common/i18n.rs

use std::collections::HashMap;

// Catalogs embedded at compile time, one flat key -> message map per language.
const CATALOGS: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("pt", include_str!("../../locales/pt.json")),
];

#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
    default_lang: String,
}

impl I18nStore {
    pub fn load(default_lang: &str) -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("invalid catalog '{}': {}", lang, e))?;
            catalogs.insert(lang.to_string(), messages);
        }

        let default_lang = if catalogs.contains_key(default_lang) {
            default_lang.to_string()
        } else {
            tracing::warn!("Unknown default locale '{}', using 'en'", default_lang);
            "en".to_string()
        };

        Ok(Self { catalogs, default_lang })
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    /// Looks the key up in `lang`, then in the default language, and finally
    /// returns the key itself so a missing entry is visible instead of empty.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.catalogs
            .get(lang)
            .and_then(|c| c.get(key))
            .or_else(|| {
                self.catalogs
                    .get(&self.default_lang)
                    .and_then(|c| c.get(key))
            })
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
