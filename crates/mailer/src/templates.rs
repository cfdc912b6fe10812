// Path: crates/mailer/src/templates.rs
//! `(template, locale)` → rendered HTML/text resolution (spec §6, "Template
//! resolution"), with file-read-once-then-cache as the suspension point
//! (spec §4 "Suspension points").

use ackify_types::error::CoreError;
use dashmap::DashMap;
use handlebars::Handlebars;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A rendered message, ready to hand to the SMTP transport.
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

/// Resolves `(template, locale)` to `{template}.{locale}.html.tmpl` /
/// `.txt.tmpl` under `template_dir`, falling back to `default_locale` on a
/// locale miss. Compiled templates are cached by `(template, locale, part)`
/// so disk I/O only happens on first use per process, as spec §4 requires.
pub struct TemplateResolver {
    template_dir: PathBuf,
    default_locale: String,
    organisation: String,
    base_url: String,
    from_name: String,
    from_address: String,
    cache: DashMap<(String, String, Part), String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Part {
    Html,
    Text,
}

impl TemplateResolver {
    pub fn new(
        template_dir: impl Into<PathBuf>,
        default_locale: impl Into<String>,
        organisation: impl Into<String>,
        base_url: impl Into<String>,
        from_name: impl Into<String>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            template_dir: template_dir.into(),
            default_locale: default_locale.into(),
            organisation: organisation.into(),
            base_url: base_url.into(),
            from_name: from_name.into(),
            from_address: from_address.into(),
            cache: DashMap::new(),
        }
    }

    /// Renders `template` for `locale`, substituting `data` plus the
    /// ambient `{Organisation, BaseURL, FromName, FromMail}` variables
    /// (spec §6). Returns [`CoreError::Validation`] with message
    /// `template not found` if neither the requested locale nor the
    /// default locale has the template on disk — the dispatcher treats
    /// this as a permanent failure (spec §4.7 step 6).
    pub fn render(&self, template: &str, locale: &str, data: &Value) -> Result<RenderedEmail, CoreError> {
        let html = self.render_part(template, locale, Part::Html, data)?;
        let text = self.render_part(template, locale, Part::Text, data)?;
        Ok(RenderedEmail { html, text })
    }

    fn render_part(&self, template: &str, locale: &str, part: Part, data: &Value) -> Result<String, CoreError> {
        let key = (template.to_string(), locale.to_string(), part);
        if let Some(cached) = self.cache.get(&key) {
            return self.substitute(&cached, data);
        }

        let source = self
            .read_source(template, locale, part)
            .or_else(|| {
                if locale == self.default_locale {
                    None
                } else {
                    self.read_source(template, &self.default_locale, part)
                }
            })
            .ok_or_else(|| CoreError::Validation("template not found".into()))?;

        self.cache.insert(key, source.clone());
        self.substitute(&source, data)
    }

    fn read_source(&self, template: &str, locale: &str, part: Part) -> Option<String> {
        let ext = match part {
            Part::Html => "html.tmpl",
            Part::Text => "txt.tmpl",
        };
        let path: PathBuf = Path::new(&self.template_dir).join(format!("{template}.{locale}.{ext}"));
        std::fs::read_to_string(path).ok()
    }

    fn substitute(&self, source: &str, data: &Value) -> Result<String, CoreError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);

        let mut context = serde_json::json!({
            "Organisation": self.organisation,
            "BaseURL": self.base_url,
            "FromName": self.from_name,
            "FromMail": self.from_address,
            "Data": data,
        });
        if let (Some(ctx_obj), Some(data_obj)) = (context.as_object_mut(), data.as_object()) {
            for (k, v) in data_obj {
                ctx_obj.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        registry
            .render_template(source, &context)
            .map_err(|e| CoreError::Internal(anyhow::anyhow!(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_template(dir: &Path, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn falls_back_to_default_locale_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "welcome.en.html.tmpl", "Hi {{Data.name}} from {{Organisation}}");
        write_template(dir.path(), "welcome.en.txt.tmpl", "Hi {{Data.name}}");

        let resolver = TemplateResolver::new(
            dir.path(),
            "en",
            "Acme Corp",
            "https://acme.example",
            "Acme Notifications",
            "no-reply@acme.example",
        );

        let rendered = resolver
            .render("welcome", "fr", &serde_json::json!({"name": "Remy"}))
            .unwrap();
        assert!(rendered.html.contains("Remy"));
        assert!(rendered.html.contains("Acme Corp"));
    }

    #[test]
    fn missing_template_in_every_locale_fails_permanently() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = TemplateResolver::new(dir.path(), "en", "Acme", "https://acme.example", "A", "a@acme.example");
        let err = resolver.render("nonexistent", "en", &serde_json::json!({})).unwrap_err();
        match err {
            CoreError::Validation(msg) => assert_eq!(msg, "template not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
