/// Static catalog of background styles offered for generation

/// Descriptor used when a caller does not pick a style
pub const DEFAULT_STYLE_DESCRIPTOR: &str = "modern corporate tech";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleOption {
    pub id: &'static str,
    pub label: &'static str,
    pub prompt_fragment: &'static str,
}

const CATALOG: [StyleOption; 4] = [
    StyleOption {
        id: "modern",
        label: "Moderno Tech",
        prompt_fragment: "clean modern corporate tech with 3D elements, blue and white theme",
    },
    StyleOption {
        id: "minimal",
        label: "Minimalista",
        prompt_fragment: "minimalist elegant office setting, soft lighting, professional",
    },
    StyleOption {
        id: "cyber",
        label: "Futurista",
        prompt_fragment: "futuristic cyberpunk neon blue and purple, digital agents, hologram",
    },
    StyleOption {
        id: "human",
        label: "Cercano",
        prompt_fragment: "friendly smiling customer support representative in a modern bright office",
    },
];

impl StyleOption {
    pub fn all() -> &'static [StyleOption] {
        &CATALOG
    }

    pub fn find(id: &str) -> Option<&'static StyleOption> {
        let id = id.trim();
        CATALOG.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }
}

impl Default for StyleOption {
    fn default() -> Self {
        CATALOG[0]
    }
}

/// Resolve what the caller passed into the descriptor sent upstream.
///
/// Catalog ids map to their prompt fragment, blank input maps to the
/// default descriptor, anything else is used verbatim.
pub fn resolve_style(input: &str) -> String {
    if input.trim().is_empty() {
        return DEFAULT_STYLE_DESCRIPTOR.to_string();
    }
    match StyleOption::find(input) {
        Some(style) => style.prompt_fragment.to_string(),
        None => input.to_string(),
    }
}
