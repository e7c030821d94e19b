//! The binding table: which content key lands in which page slot, and how.
//!
//! Adding a slot is a data change here; [`crate::Binder`] walks the table
//! uniformly and never special-cases a key.

use scraper::Selector;
use sheetbind_shared::{Result, SheetbindError};

use crate::BinderOptions;

/// Singleton slots addressed by element id (`hero_title` → `#hero-title`).
pub(crate) const SINGLETON_KEYS: [&str; 6] = [
    "hero_title",
    "hero_description",
    "about_title",
    "about_description",
    "about_highlight_text",
    "about_doctors_title",
];

/// Service cards; each has `{service}_title` and `{service}_description`.
pub(crate) const SERVICES: [&str; 6] = [
    "service_glass",
    "service_ophthalmology",
    "service_hearing",
    "service_surdology",
    "service_otolaryngology",
    "service_allergology",
];

/// Number of team member cards.
pub(crate) const TEAM_SIZE: usize = 4;

/// Number of testimonial cards.
pub(crate) const TESTIMONIAL_COUNT: usize = 3;

/// Grouping used when listing the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCategory {
    Singleton,
    Service,
    Team,
    Testimonial,
    Contact,
    Hours,
}

impl std::fmt::Display for SlotCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Singleton => "singleton",
            Self::Service => "service",
            Self::Team => "team",
            Self::Testimonial => "testimonial",
            Self::Contact => "contact",
            Self::Hours => "hours",
        };
        f.write_str(name)
    }
}

/// A parsed CSS selector that remembers its source text.
#[derive(Debug, Clone)]
pub struct Css {
    source: String,
    selector: Selector,
}

impl Css {
    pub fn parse(source: &str) -> Result<Self> {
        let selector = Selector::parse(source)
            .map_err(|e| SheetbindError::parse(format!("invalid selector '{source}': {e}")))?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl std::fmt::Display for Css {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// How a rule finds its element(s).
#[derive(Debug, Clone)]
pub enum Target {
    /// The element with this id.
    Id(String),
    /// The first element matching the selector.
    First(Css),
    /// Every element matching the selector.
    Each(Css),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::First(sel) => write!(f, "first {sel}"),
            Self::Each(sel) => write!(f, "each {sel}"),
        }
    }
}

/// What a rule writes into its element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Replace the element's children with the value as text.
    Text,
    /// `<strong>{label}</strong> {value}`.
    LabeledText { label: String },
    /// Rewrite `href` to `{scheme}{value}` and show the value as link text.
    /// With `digits_only`, the href keeps only the value's ASCII digits.
    Link { scheme: &'static str, digits_only: bool },
    /// Replace the text of each targeted line containing `marker`.
    ReplaceLine { marker: String },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::LabeledText { label } => write!(f, "text after <strong>{label}</strong>"),
            Self::Link {
                scheme,
                digits_only: true,
            } => write!(f, "href {scheme}<digits> + text"),
            Self::Link { scheme, .. } => write!(f, "href {scheme}<value> + text"),
            Self::ReplaceLine { marker } => write!(f, "line containing {marker:?}"),
        }
    }
}

/// One entry of the binding table.
#[derive(Debug, Clone)]
pub struct SlotRule {
    pub key: String,
    pub category: SlotCategory,
    pub target: Target,
    pub action: Action,
}

impl SlotRule {
    fn new(key: impl Into<String>, category: SlotCategory, target: Target, action: Action) -> Self {
        Self {
            key: key.into(),
            category,
            target,
            action,
        }
    }

    fn text_by_id(key: String, category: SlotCategory, id: String) -> Self {
        Self::new(key, category, Target::Id(id), Action::Text)
    }
}

/// Build the full table, in application order.
pub fn binding_table(options: &BinderOptions) -> Result<Vec<SlotRule>> {
    let mut rules = Vec::new();

    for key in SINGLETON_KEYS {
        rules.push(SlotRule::text_by_id(
            key.to_string(),
            SlotCategory::Singleton,
            key.replace('_', "-"),
        ));
    }

    for service in SERVICES {
        for part in ["title", "description"] {
            rules.push(SlotRule::text_by_id(
                format!("{service}_{part}"),
                SlotCategory::Service,
                format!("{service}-{part}"),
            ));
        }
    }

    for i in 1..=TEAM_SIZE {
        for (part, inner) in [("name", ".team-name"), ("role", ".team-role")] {
            let selector = Css::parse(&format!(".team-member:nth-child({i}) {inner}"))?;
            rules.push(SlotRule::new(
                format!("team_{i}_{part}"),
                SlotCategory::Team,
                Target::First(selector),
                Action::Text,
            ));
        }
    }

    for i in 1..=TESTIMONIAL_COUNT {
        for (part, inner) in [("text", ".testimonial-text"), ("author", ".author-info h4")] {
            let selector =
                Css::parse(&format!(".testimonial-card:nth-child({i}) {inner}"))?;
            rules.push(SlotRule::new(
                format!("testimonial_{i}_{part}"),
                SlotCategory::Testimonial,
                Target::First(selector),
                Action::Text,
            ));
        }
    }

    rules.push(SlotRule::new(
        "contact_address",
        SlotCategory::Contact,
        Target::First(Css::parse(".contact-info p:nth-of-type(1)")?),
        Action::LabeledText {
            label: options.address_label.clone(),
        },
    ));
    rules.push(SlotRule::new(
        "contact_phone",
        SlotCategory::Contact,
        Target::First(Css::parse(r#"a[href^="tel:"]"#)?),
        Action::Link {
            scheme: "tel:",
            digits_only: true,
        },
    ));
    rules.push(SlotRule::new(
        "contact_email",
        SlotCategory::Contact,
        Target::First(Css::parse(r#"a[href^="mailto:"]"#)?),
        Action::Link {
            scheme: "mailto:",
            digits_only: false,
        },
    ));

    let hour_lines = Css::parse(".contact-info p")?;
    for (key, marker) in [
        ("contact_hours_weekday", &options.weekday_marker),
        ("contact_hours_saturday", &options.saturday_marker),
        ("contact_hours_sunday", &options.sunday_marker),
    ] {
        rules.push(SlotRule::new(
            key,
            SlotCategory::Hours,
            Target::Each(hour_lines.clone()),
            Action::ReplaceLine {
                marker: marker.clone(),
            },
        ));
    }

    Ok(rules)
}
