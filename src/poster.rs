//! The poster record and its partial-update merge

use crate::image_ref::ImageRef;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// All editable content of the poster.
///
/// Image fields hold either an http(s) URL or a `data:<mime>;base64,...`
/// reference. `featured_image_url` is never empty once a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterRecord {
    pub title: String,
    pub subtitle: String,
    pub cta_text: String,
    pub logo_url: String,
    pub featured_image_url: String,
    pub secondary_image_url: String,
}

impl Default for PosterRecord {
    /// The seed record every session starts from
    fn default() -> Self {
        Self {
            title: "Agentes Personalizados con IA disponibles las 24 horas".to_string(),
            subtitle: "Atiende a tus clientes sin interrupciones con los detalles más importantes de tu negocio automatizados.".to_string(),
            cta_text: "¡Automatiza tu éxito hoy!".to_string(),
            logo_url: "https://i.ibb.co/hR8jSgW1/logo.png".to_string(),
            featured_image_url: "https://images.unsplash.com/photo-1531746790731-6c087fecd65a?auto=format&fit=crop&q=80&w=1000".to_string(),
            secondary_image_url: "https://images.unsplash.com/photo-1551288049-bebda4e38f71?auto=format&fit=crop&q=80&w=1000".to_string(),
        }
    }
}

impl PosterRecord {
    /// Merge a patch into this record in place
    pub fn apply(&mut self, patch: &PosterPatch) {
        *self = apply_partial(self, patch);
    }

    /// Topic text fed to background generation
    pub fn topic(&self) -> String {
        format!("{}. {}", self.title, self.subtitle)
    }

    pub fn get(&self, field: PosterField) -> &str {
        match field {
            PosterField::Title => &self.title,
            PosterField::Subtitle => &self.subtitle,
            PosterField::CtaText => &self.cta_text,
            PosterField::LogoUrl => &self.logo_url,
            PosterField::FeaturedImageUrl => &self.featured_image_url,
            PosterField::SecondaryImageUrl => &self.secondary_image_url,
        }
    }
}

/// A partial record: `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PosterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_image_url: Option<String>,
}

impl PosterPatch {
    pub fn featured_image(image: &ImageRef) -> Self {
        Self {
            featured_image_url: Some(image.to_reference_string()),
            ..Default::default()
        }
    }

    /// Set one field by name (builder style)
    pub fn set(mut self, field: PosterField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            PosterField::Title => self.title = value,
            PosterField::Subtitle => self.subtitle = value,
            PosterField::CtaText => self.cta_text = value,
            PosterField::LogoUrl => self.logo_url = value,
            PosterField::FeaturedImageUrl => self.featured_image_url = value,
            PosterField::SecondaryImageUrl => self.secondary_image_url = value,
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == PosterPatch::default()
    }
}

/// Pure merge: fields present in `patch` replace those of `current`, the
/// rest are carried over unchanged.
pub fn apply_partial(current: &PosterRecord, patch: &PosterPatch) -> PosterRecord {
    fn pick(new: &Option<String>, old: &str) -> String {
        new.clone().unwrap_or_else(|| old.to_string())
    }

    PosterRecord {
        title: pick(&patch.title, &current.title),
        subtitle: pick(&patch.subtitle, &current.subtitle),
        cta_text: pick(&patch.cta_text, &current.cta_text),
        logo_url: pick(&patch.logo_url, &current.logo_url),
        featured_image_url: pick(&patch.featured_image_url, &current.featured_image_url),
        secondary_image_url: pick(&patch.secondary_image_url, &current.secondary_image_url),
    }
}

/// Addressable poster fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosterField {
    Title,
    Subtitle,
    CtaText,
    LogoUrl,
    FeaturedImageUrl,
    SecondaryImageUrl,
}

impl PosterField {
    pub const ALL: [PosterField; 6] = [
        PosterField::Title,
        PosterField::Subtitle,
        PosterField::CtaText,
        PosterField::LogoUrl,
        PosterField::FeaturedImageUrl,
        PosterField::SecondaryImageUrl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PosterField::Title => "title",
            PosterField::Subtitle => "subtitle",
            PosterField::CtaText => "cta-text",
            PosterField::LogoUrl => "logo-url",
            PosterField::FeaturedImageUrl => "featured-image-url",
            PosterField::SecondaryImageUrl => "secondary-image-url",
        }
    }
}

impl FromStr for PosterField {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        PosterField::ALL
            .into_iter()
            .find(|f| f.name() == normalized || f.name().replace('-', "") == normalized)
            .ok_or_else(|| crate::Error::Other(format!("Unknown poster field: {}", s)))
    }
}

/// Whether an image request is in flight.
///
/// Errors are tracked separately as a display string on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    EditingImage,
}
