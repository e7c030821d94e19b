//! Binds a [`ContentMap`] onto the fixed slots of the site page.
//!
//! Every rule in the binding table is guarded twice: the content value must be
//! non-empty and the target element must exist. A rule failing either guard
//! leaves its slot exactly as authored, so binding itself cannot fail.

pub mod dom;
pub mod rules;

use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use sheetbind_shared::{BindingConfig, ContentMap, Result};
use tracing::{debug, instrument};

pub use dom::Document;
pub use rules::{Action, Css, SlotCategory, SlotRule, Target, binding_table};

/// Language-specific strings used by the contact slots.
#[derive(Debug, Clone)]
pub struct BinderOptions {
    pub address_label: String,
    pub weekday_marker: String,
    pub saturday_marker: String,
    pub sunday_marker: String,
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self::from(&BindingConfig::default())
    }
}

impl From<&BindingConfig> for BinderOptions {
    fn from(config: &BindingConfig) -> Self {
        Self {
            address_label: config.address_label.clone(),
            weekday_marker: config.weekday_marker.clone(),
            saturday_marker: config.saturday_marker.clone(),
            sunday_marker: config.sunday_marker.clone(),
        }
    }
}

/// Counts from one [`Binder::apply`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Rules that wrote to at least one element.
    pub applied: usize,
    /// Rules skipped because the key was absent or blank.
    pub missing_value: usize,
    /// Rules skipped because no element matched.
    pub missing_target: usize,
}

/// Whether a rule's target exists in a given page.
#[derive(Debug, Clone)]
pub struct SlotStatus {
    pub rule: SlotRule,
    pub matched: usize,
}

/// Applies the binding table to documents.
pub struct Binder {
    rules: Vec<SlotRule>,
}

impl Binder {
    pub fn new(options: BinderOptions) -> Result<Self> {
        Ok(Self {
            rules: binding_table(&options)?,
        })
    }

    pub fn rules(&self) -> &[SlotRule] {
        &self.rules
    }

    /// Write every available value into its slot.
    #[instrument(skip_all, fields(fields = content.len()))]
    pub fn apply(&self, doc: &mut Document, content: &ContentMap) -> ApplyReport {
        let mut report = ApplyReport::default();
        // Lines already rewritten by an hours rule; later hours rules skip them
        let mut claimed_lines: Vec<NodeId> = Vec::new();

        for rule in &self.rules {
            let Some(value) = content.value(&rule.key) else {
                report.missing_value += 1;
                continue;
            };

            let targets = resolve(doc, &rule.target);
            let written = match &rule.action {
                Action::ReplaceLine { marker } => {
                    replace_lines(doc, &targets, marker, value, &mut claimed_lines)
                }
                action => match targets.first() {
                    Some(&el) => {
                        write_slot(doc, el, action, value);
                        1
                    }
                    None => 0,
                },
            };

            if written == 0 {
                debug!(key = %rule.key, target = %rule.target, "slot target not found");
                report.missing_target += 1;
            } else {
                report.applied += 1;
            }
        }

        debug!(
            applied = report.applied,
            missing_value = report.missing_value,
            missing_target = report.missing_target,
            "binding complete"
        );
        report
    }

    /// Report how many elements each rule's target resolves to in `doc`.
    pub fn audit(&self, doc: &Document) -> Vec<SlotStatus> {
        self.rules
            .iter()
            .map(|rule| {
                let targets = resolve(doc, &rule.target);
                let matched = match &rule.action {
                    Action::ReplaceLine { marker } => targets
                        .iter()
                        .filter(|&&el| doc.text_content(el).contains(marker.as_str()))
                        .count(),
                    _ => targets.len(),
                };
                SlotStatus {
                    rule: rule.clone(),
                    matched,
                }
            })
            .collect()
    }
}

fn resolve(doc: &Document, target: &Target) -> Vec<NodeId> {
    match target {
        Target::Id(id) => doc.element_by_id(id).into_iter().collect(),
        Target::First(css) => doc.select_first(css.selector()).into_iter().collect(),
        Target::Each(css) => doc.select_all(css.selector()),
    }
}

fn write_slot(doc: &mut Document, el: NodeId, action: &Action, value: &str) {
    match action {
        Action::Text => doc.set_text(el, value),
        Action::LabeledText { label } => doc.set_labeled_text(el, label, value),
        Action::Link {
            scheme,
            digits_only,
        } => {
            let target = if *digits_only {
                digits(value)
            } else {
                value.to_string()
            };
            // Targets are selected by href prefix, so the attribute is present
            doc.set_attr(el, "href", &format!("{scheme}{target}"));
            doc.set_text(el, value);
        }
        // Multi-target; handled by `replace_lines`
        Action::ReplaceLine { .. } => {}
    }
}

fn replace_lines(
    doc: &mut Document,
    lines: &[NodeId],
    marker: &str,
    value: &str,
    claimed: &mut Vec<NodeId>,
) -> usize {
    let mut written = 0;
    for &line in lines {
        if claimed.contains(&line) {
            continue;
        }
        if doc.text_content(line).contains(marker) {
            doc.set_text(line, value);
            claimed.push(line);
            written += 1;
        }
    }
    written
}

/// Strip everything but digits: `+38 (044) 123-45-67` → `380441234567`.
pub fn digits(value: &str) -> String {
    static NON_DIGIT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\D").expect("valid regex"));
    NON_DIGIT_RE.replace_all(value, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn page() -> String {
        load_fixture("index.html")
    }

    fn content(pairs: &[(&str, &str)]) -> ContentMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn render(content: &ContentMap) -> (String, ApplyReport) {
        let binder = Binder::new(BinderOptions::default()).unwrap();
        let mut doc = Document::parse(&page());
        let report = binder.apply(&mut doc, content);
        (doc.to_html(), report)
    }

    fn texts(html: &str, css: &str) -> Vec<String> {
        let page = Html::parse_document(html);
        let sel = Selector::parse(css).unwrap();
        page.select(&sel)
            .map(|el| el.text().collect::<String>())
            .collect()
    }

    fn first_text(html: &str, css: &str) -> String {
        texts(html, css).into_iter().next().unwrap_or_default()
    }

    fn first_attr(html: &str, css: &str, name: &str) -> Option<String> {
        let page = Html::parse_document(html);
        let sel = Selector::parse(css).unwrap();
        page.select(&sel)
            .next()
            .and_then(|el| el.value().attr(name).map(String::from))
    }

    #[test]
    fn digits_strips_formatting() {
        assert_eq!(digits("+38 (044) 123-45-67"), "380441234567");
        assert_eq!(digits("no digits"), "");
    }

    #[test]
    fn empty_content_leaves_page_untouched() {
        let (html, report) = render(&ContentMap::new());
        let original = Document::parse(&page()).to_html();
        assert_eq!(html, original);
        assert_eq!(report.applied, 0);
        assert_eq!(report.missing_value, 38);
    }

    #[test]
    fn single_key_updates_single_slot() {
        let (html, report) = render(&content(&[("hero_title", "Турбота про ваш зір і слух")]));
        let original = Document::parse(&page()).to_html();

        assert_eq!(report.applied, 1);
        assert_eq!(first_text(&html, "#hero-title"), "Турбота про ваш зір і слух");
        assert_eq!(
            first_text(&html, "#hero-description"),
            first_text(&original, "#hero-description")
        );
        assert_eq!(texts(&html, ".team-name"), texts(&original, ".team-name"));
        assert_eq!(
            texts(&html, ".contact-info p"),
            texts(&original, ".contact-info p")
        );
    }

    #[test]
    fn services_team_and_testimonials() {
        let (html, _) = render(&content(&[
            ("service_hearing_title", "Слухові апарати"),
            ("service_hearing_description", "Підбір та налаштування"),
            ("team_2_name", "Олена Коваль"),
            ("team_2_role", "Офтальмолог"),
            ("testimonial_3_text", "Дуже уважні лікарі"),
            ("testimonial_3_author", "Ірина"),
        ]));

        assert_eq!(first_text(&html, "#service_hearing-title"), "Слухові апарати");
        assert_eq!(
            first_text(&html, "#service_hearing-description"),
            "Підбір та налаштування"
        );
        let names = texts(&html, ".team-member .team-name");
        assert_eq!(names[1], "Олена Коваль");
        assert_ne!(names[0], "Олена Коваль");
        assert_eq!(texts(&html, ".team-member .team-role")[1], "Офтальмолог");
        assert_eq!(texts(&html, ".testimonial-text")[2], "Дуже уважні лікарі");
        assert_eq!(texts(&html, ".author-info h4")[2], "Ірина");
    }

    #[test]
    fn contact_slots() {
        let (html, _) = render(&content(&[
            ("contact_address", "м. Київ, вул. Хрещатик, 22"),
            ("contact_phone", "+38 (044) 123-45-67"),
            ("contact_email", "info@dobrolikar.ua"),
        ]));

        assert_eq!(
            first_text(&html, ".contact-info p"),
            "Адреса: м. Київ, вул. Хрещатик, 22"
        );
        assert_eq!(first_text(&html, ".contact-info p strong"), "Адреса:");
        assert_eq!(
            first_attr(&html, r#"a[href^="tel:"]"#, "href").as_deref(),
            Some("tel:380441234567")
        );
        assert_eq!(first_text(&html, r#"a[href^="tel:"]"#), "+38 (044) 123-45-67");
        assert_eq!(
            first_attr(&html, r#"a[href^="mailto:"]"#, "href").as_deref(),
            Some("mailto:info@dobrolikar.ua")
        );
        assert_eq!(first_text(&html, r#"a[href^="mailto:"]"#), "info@dobrolikar.ua");
    }

    #[test]
    fn address_value_is_text_not_markup() {
        let (html, _) = render(&content(&[("contact_address", "<script>x</script>")]));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
    }

    #[test]
    fn hours_lines_match_by_marker() {
        let (html, report) = render(&content(&[
            ("contact_hours_weekday", "Пн-Пт: 8:00 - 20:00"),
            ("contact_hours_sunday", "Неділя: вихідний"),
        ]));

        let lines = texts(&html, ".contact-info p");
        assert!(lines.contains(&"Пн-Пт: 8:00 - 20:00".to_string()));
        assert!(lines.contains(&"Неділя: вихідний".to_string()));
        // Saturday line keeps its authored text
        assert!(lines.iter().any(|l| l.contains("Сб: 10:00 - 16:00")));
        assert_eq!(report.applied, 2);
    }

    #[test]
    fn hours_line_is_rewritten_once() {
        // A weekday value that itself contains the Saturday marker
        let (html, _) = render(&content(&[
            ("contact_hours_weekday", "Пн-Пт: 9-18, Сб: 10-14"),
            ("contact_hours_saturday", "Субота: 10-15"),
        ]));

        let lines = texts(&html, ".contact-info p");
        assert!(lines.contains(&"Пн-Пт: 9-18, Сб: 10-14".to_string()));
        assert!(lines.contains(&"Субота: 10-15".to_string()));
    }

    #[test]
    fn blank_value_is_skipped() {
        let (html, report) = render(&content(&[("hero_title", ""), ("about_title", "Про нас")]));
        let original = Document::parse(&page()).to_html();

        assert_eq!(first_text(&html, "#hero-title"), first_text(&original, "#hero-title"));
        assert_eq!(first_text(&html, "#about-title"), "Про нас");
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn missing_targets_are_counted_not_fatal() {
        let binder = Binder::new(BinderOptions::default()).unwrap();
        let mut doc = Document::parse("<html><body><p>bare page</p></body></html>");
        let report = binder.apply(
            &mut doc,
            &content(&[("hero_title", "x"), ("contact_phone", "+380"), ("team_1_name", "y")]),
        );
        assert_eq!(report.applied, 0);
        assert_eq!(report.missing_target, 3);
        assert!(doc.to_html().contains("bare page"));
    }

    #[test]
    fn binding_is_idempotent() {
        let full = content(&[
            ("hero_title", "Добролікар"),
            ("about_description", "Медичний центр"),
            ("team_1_name", "Андрій"),
            ("testimonial_1_author", "Марія"),
            ("contact_address", "м. Київ"),
            ("contact_phone", "+38 (044) 123-45-67"),
            ("contact_email", "info@dobrolikar.ua"),
            ("contact_hours_weekday", "Пн-Пт: 9:00 - 19:00"),
            ("contact_hours_saturday", "Сб: 9:00 - 15:00"),
        ]);
        let binder = Binder::new(BinderOptions::default()).unwrap();

        let mut once = Document::parse(&page());
        binder.apply(&mut once, &full);
        let once = once.to_html();

        let mut twice = Document::parse(&page());
        binder.apply(&mut twice, &full);
        binder.apply(&mut twice, &full);
        assert_eq!(twice.to_html(), once);
    }

    #[test]
    fn audit_reports_resolved_targets() {
        let binder = Binder::new(BinderOptions::default()).unwrap();
        let doc = Document::parse(&page());
        let statuses = binder.audit(&doc);

        assert_eq!(statuses.len(), binder.rules().len());
        assert!(statuses.iter().all(|s| s.matched > 0), "fixture should cover every slot");

        let bare = Document::parse("<html><body></body></html>");
        assert!(binder.audit(&bare).iter().all(|s| s.matched == 0));
    }
}
