//! The fixed generation pipeline submitted for every prompt.
//!
//! Jobs always run the same three stages: seed initialization, diffusion
//! with the house style prompts, and an ADetailer face-restoration pass.
//! Every tuning knob lives in the constants tables below so generation
//! behavior is reviewable and changeable in one place. Field names on the
//! payload structs are part of the upstream wire contract and serialize
//! exactly as the generation API expects them.

use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Prompt constants
// ---------------------------------------------------------------------------

/// Style/quality suffix appended verbatim to every user prompt. Biases
/// generation toward the product's anime look; upstream treats it as plain
/// prompt text, so the exact bytes matter only for output consistency.
pub const PROMPT_QUALITY_SUFFIX: &str = ", ,score_9,score_8, ,vivid colours, polished art, , source_anime, anime style, , official art,, best quality, masterpiece, , hi res, best_quality, very aesthetic, absurdres, 8k,";

/// Fixed negative prompt applied to every job.
pub const NEGATIVE_PROMPT: &str = "monochrome, greyscale, large_areolas, big_areolae, (deformed, distorted, disfigured:1.4), (mutated hands and fingers:1.4), score_5, score_4, text, censored, deformed, bad hand, blurry, (watermark), extra hands, kid, earrings, chin sweat, bod, fat bbw, curvy, 3d, flowers in hair, real life, realistic, 4K, 8k, high_resolution, shading, professional lighting, volumetric lighting, detailed";

/// Hard ceiling on user prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

// ---------------------------------------------------------------------------
// Diffusion tuning
// ---------------------------------------------------------------------------

pub const OUTPUT_WIDTH: u32 = 1024;
pub const OUTPUT_HEIGHT: u32 = 1360;
pub const DIFFUSION_STEPS: u32 = 20;
pub const SD_MODEL: &str = "840915259221871955";
pub const CLIP_SKIP: u32 = 2;
pub const CFG_SCALE: u32 = 6;
pub const SAMPLER: &str = "Euler a";
/// `-1` asks the generation API to pick a random seed.
pub const SEED_RANDOM: i64 = -1;
/// Images produced per job.
pub const OUTPUT_COUNT: u32 = 1;

/// LoRA fine-tunes applied to every job: `(model id, weight)`.
pub const LORA_WEIGHTS: &[(&str, f64)] = &[
    ("746566089133031686", 0.8),
    ("801237307664398868", 0.5),
    ("766132482665064102", 0.2),
    ("710266515901029566", -1.0),
];

// ---------------------------------------------------------------------------
// ADetailer (face restoration) tuning
// ---------------------------------------------------------------------------

pub const ADETAILER_MODEL: &str = "face_yolov8s.pt";
pub const AD_CONFIDENCE: f64 = 0.7;
pub const AD_DILATE_ERODE: u32 = 2;
pub const AD_MASK_MERGE_INVERT: &str = "None";
pub const AD_DENOISING_STRENGTH: f64 = 0.27;
pub const AD_INPAINT_ONLY_MASKED_PADDING: u32 = 32;
pub const AD_STEPS: u32 = 10;
pub const AD_CFG_SCALE: u32 = 4;

// ---------------------------------------------------------------------------
// Job id constraints
// ---------------------------------------------------------------------------

/// Upstream job ids are short alphanumeric tokens; anything else in a status
/// path is rejected before it reaches the wire.
pub const MAX_JOB_ID_CHARS: usize = 64;

// ---------------------------------------------------------------------------
// Payload types (upstream wire contract)
// ---------------------------------------------------------------------------

/// A complete job submission payload.
#[derive(Debug, Clone, Serialize)]
pub struct JobRequest {
    /// Wall-clock milliseconds at build time, rendered as a decimal string.
    /// Unique per submission.
    pub request_id: String,
    /// The fixed three-stage pipeline, in execution order.
    pub stages: Vec<Stage>,
}

/// One pipeline stage, tagged the way the generation API expects.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Stage {
    #[serde(rename = "INPUT_INITIALIZE")]
    InputInitialize {
        #[serde(rename = "inputInitialize")]
        input_initialize: InputInitialize,
    },
    #[serde(rename = "DIFFUSION")]
    Diffusion { diffusion: Diffusion },
    #[serde(rename = "IMAGE_TO_ADETAILER")]
    ImageToAdetailer {
        #[serde(rename = "imageToAdetailer")]
        image_to_adetailer: Adetailer,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct InputInitialize {
    pub seed: i64,
    pub count: u32,
}

/// A single prompt entry. Upstream models prompts as arrays of these.
#[derive(Debug, Clone, Serialize)]
pub struct TextEntry {
    pub text: String,
}

// Upstream mixes naming styles in this object (`negativePrompts` next to
// `sd_model`), hence per-field renames instead of a container attribute.
#[derive(Debug, Clone, Serialize)]
pub struct Diffusion {
    pub width: u32,
    pub height: u32,
    pub prompts: Vec<TextEntry>,
    #[serde(rename = "negativePrompts")]
    pub negative_prompts: Vec<TextEntry>,
    pub steps: u32,
    pub sd_model: String,
    pub clip_skip: u32,
    pub cfg_scale: u32,
    pub sampler: String,
    pub embedding: Embedding,
    pub lora: Lora,
}

/// Always empty today; present because upstream requires the key.
#[derive(Debug, Clone, Serialize)]
pub struct Embedding {}

#[derive(Debug, Clone, Serialize)]
pub struct Lora {
    pub items: Vec<LoraItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoraItem {
    #[serde(rename = "loraModel")]
    pub lora_model: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Adetailer {
    pub args: Vec<AdetailerArgs>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdetailerArgs {
    pub ad_model: String,
    pub ad_prompt: Vec<TextEntry>,
    pub ad_negative_prompt: Vec<TextEntry>,
    pub ad_confidence: f64,
    pub ad_dilate_erode: u32,
    pub ad_mask_merge_invert: String,
    pub ad_denoising_strength: f64,
    pub ad_inpaint_only_masked: bool,
    pub ad_inpaint_only_masked_padding: u32,
    pub ad_use_inpaint_width_height: bool,
    pub ad_inpaint_width: u32,
    pub ad_inpaint_height: u32,
    pub ad_use_steps: bool,
    pub ad_steps: u32,
    pub ad_use_cfg_scale: bool,
    pub ad_cfg_scale: u32,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build the full job payload for `prompt`, stamped with the current
/// wall-clock time.
pub fn build_job_request(prompt: &str) -> JobRequest {
    build_job_request_at(prompt, chrono::Utc::now().timestamp_millis())
}

/// Deterministic variant of [`build_job_request`] taking the millisecond
/// timestamp used for `request_id`.
pub fn build_job_request_at(prompt: &str, unix_millis: i64) -> JobRequest {
    JobRequest {
        request_id: unix_millis.to_string(),
        stages: vec![
            Stage::InputInitialize {
                input_initialize: InputInitialize {
                    seed: SEED_RANDOM,
                    count: OUTPUT_COUNT,
                },
            },
            Stage::Diffusion {
                diffusion: Diffusion {
                    width: OUTPUT_WIDTH,
                    height: OUTPUT_HEIGHT,
                    prompts: vec![TextEntry {
                        text: format!("{prompt}{PROMPT_QUALITY_SUFFIX}"),
                    }],
                    negative_prompts: vec![TextEntry {
                        text: NEGATIVE_PROMPT.to_string(),
                    }],
                    steps: DIFFUSION_STEPS,
                    sd_model: SD_MODEL.to_string(),
                    clip_skip: CLIP_SKIP,
                    cfg_scale: CFG_SCALE,
                    sampler: SAMPLER.to_string(),
                    embedding: Embedding {},
                    lora: Lora {
                        items: LORA_WEIGHTS
                            .iter()
                            .map(|(model, weight)| LoraItem {
                                lora_model: (*model).to_string(),
                                weight: *weight,
                            })
                            .collect(),
                    },
                },
            },
            Stage::ImageToAdetailer {
                image_to_adetailer: Adetailer {
                    args: vec![AdetailerArgs {
                        ad_model: ADETAILER_MODEL.to_string(),
                        ad_prompt: vec![TextEntry {
                            text: String::new(),
                        }],
                        ad_negative_prompt: vec![TextEntry {
                            text: String::new(),
                        }],
                        ad_confidence: AD_CONFIDENCE,
                        ad_dilate_erode: AD_DILATE_ERODE,
                        ad_mask_merge_invert: AD_MASK_MERGE_INVERT.to_string(),
                        ad_denoising_strength: AD_DENOISING_STRENGTH,
                        ad_inpaint_only_masked: true,
                        ad_inpaint_only_masked_padding: AD_INPAINT_ONLY_MASKED_PADDING,
                        ad_use_inpaint_width_height: false,
                        ad_inpaint_width: OUTPUT_WIDTH,
                        ad_inpaint_height: OUTPUT_HEIGHT,
                        ad_use_steps: false,
                        ad_steps: AD_STEPS,
                        ad_use_cfg_scale: false,
                        ad_cfg_scale: AD_CFG_SCALE,
                    }],
                },
            },
        ],
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a user prompt before building a job from it.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(())
}

/// Validate an upstream job id taken from a request path.
pub fn validate_job_id(job_id: &str) -> Result<(), CoreError> {
    if job_id.is_empty() || job_id.len() > MAX_JOB_ID_CHARS {
        return Err(CoreError::Validation(format!(
            "Job id must be 1-{MAX_JOB_ID_CHARS} characters"
        )));
    }
    if !job_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::Validation(
            "Job id must be alphanumeric".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- Builder -------------------------------------------------------------

    #[test]
    fn prompt_gets_quality_suffix() {
        let request = build_job_request_at("a fox in the forest", 1_700_000_000_000);
        let value = serde_json::to_value(&request).unwrap();
        let text = value
            .pointer("/stages/1/diffusion/prompts/0/text")
            .and_then(|v| v.as_str())
            .unwrap();
        assert_eq!(text, format!("a fox in the forest{PROMPT_QUALITY_SUFFIX}"));
        assert!(text.starts_with("a fox in the forest"));
    }

    #[test]
    fn negative_prompt_is_the_fixed_constant() {
        let request = build_job_request_at("x", 0);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value
                .pointer("/stages/1/diffusion/negativePrompts/0/text")
                .and_then(|v| v.as_str()),
            Some(NEGATIVE_PROMPT)
        );
    }

    #[test]
    fn request_id_is_wall_clock_millis() {
        let before = chrono::Utc::now().timestamp_millis();
        let request = build_job_request("x");
        let after = chrono::Utc::now().timestamp_millis();
        let id: i64 = request.request_id.parse().unwrap();
        assert!(id >= before && id <= after);
    }

    #[test]
    fn request_id_matches_provided_millis() {
        let request = build_job_request_at("x", 1_700_000_000_123);
        assert_eq!(request.request_id, "1700000000123");
    }

    #[test]
    fn stages_are_ordered_and_tagged() {
        let request = build_job_request_at("x", 0);
        let value = serde_json::to_value(&request).unwrap();
        let types: Vec<&str> = value["stages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["type"].as_str().unwrap())
            .collect();
        assert_eq!(
            types,
            vec!["INPUT_INITIALIZE", "DIFFUSION", "IMAGE_TO_ADETAILER"]
        );
    }

    #[test]
    fn lora_table_is_applied_in_order() {
        let request = build_job_request_at("x", 0);
        let value = serde_json::to_value(&request).unwrap();
        let items = value
            .pointer("/stages/1/diffusion/lora/items")
            .and_then(|v| v.as_array())
            .unwrap();
        assert_eq!(items.len(), LORA_WEIGHTS.len());
        for (item, (model, weight)) in items.iter().zip(LORA_WEIGHTS) {
            assert_eq!(item["loraModel"].as_str(), Some(*model));
            assert_eq!(item["weight"].as_f64(), Some(*weight));
        }
    }

    #[test]
    fn full_payload_matches_wire_contract() {
        let request = build_job_request_at("a fox in the forest", 1_700_000_000_000);
        let expected = json!({
            "request_id": "1700000000000",
            "stages": [
                {
                    "type": "INPUT_INITIALIZE",
                    "inputInitialize": { "seed": -1, "count": 1 }
                },
                {
                    "type": "DIFFUSION",
                    "diffusion": {
                        "width": 1024,
                        "height": 1360,
                        "prompts": [
                            { "text": format!("a fox in the forest{PROMPT_QUALITY_SUFFIX}") }
                        ],
                        "negativePrompts": [{ "text": NEGATIVE_PROMPT }],
                        "steps": 20,
                        "sd_model": "840915259221871955",
                        "clip_skip": 2,
                        "cfg_scale": 6,
                        "sampler": "Euler a",
                        "embedding": {},
                        "lora": {
                            "items": [
                                { "loraModel": "746566089133031686", "weight": 0.8 },
                                { "loraModel": "801237307664398868", "weight": 0.5 },
                                { "loraModel": "766132482665064102", "weight": 0.2 },
                                { "loraModel": "710266515901029566", "weight": -1.0 }
                            ]
                        }
                    }
                },
                {
                    "type": "IMAGE_TO_ADETAILER",
                    "imageToAdetailer": {
                        "args": [
                            {
                                "adModel": "face_yolov8s.pt",
                                "adPrompt": [{ "text": "" }],
                                "adNegativePrompt": [{ "text": "" }],
                                "adConfidence": 0.7,
                                "adDilateErode": 2,
                                "adMaskMergeInvert": "None",
                                "adDenoisingStrength": 0.27,
                                "adInpaintOnlyMasked": true,
                                "adInpaintOnlyMaskedPadding": 32,
                                "adUseInpaintWidthHeight": false,
                                "adInpaintWidth": 1024,
                                "adInpaintHeight": 1360,
                                "adUseSteps": false,
                                "adSteps": 10,
                                "adUseCfgScale": false,
                                "adCfgScale": 4
                            }
                        ]
                    }
                }
            ]
        });
        assert_eq!(serde_json::to_value(&request).unwrap(), expected);
    }

    // -- Prompt validation ---------------------------------------------------

    #[test]
    fn validate_prompt_accepts_normal_text() {
        assert!(validate_prompt("a fox in the forest").is_ok());
    }

    #[test]
    fn validate_prompt_rejects_empty() {
        assert!(validate_prompt("").is_err());
    }

    #[test]
    fn validate_prompt_rejects_whitespace_only() {
        assert!(validate_prompt("   \n\t").is_err());
    }

    #[test]
    fn validate_prompt_rejects_overlong() {
        let prompt = "x".repeat(MAX_PROMPT_CHARS + 1);
        assert!(validate_prompt(&prompt).is_err());
    }

    #[test]
    fn validate_prompt_accepts_max_length() {
        let prompt = "x".repeat(MAX_PROMPT_CHARS);
        assert!(validate_prompt(&prompt).is_ok());
    }

    // -- Job id validation ---------------------------------------------------

    #[test]
    fn validate_job_id_accepts_alphanumeric() {
        assert!(validate_job_id("736851297236698412").is_ok());
        assert!(validate_job_id("abc123XYZ").is_ok());
    }

    #[test]
    fn validate_job_id_rejects_empty() {
        assert!(validate_job_id("").is_err());
    }

    #[test]
    fn validate_job_id_rejects_path_characters() {
        assert!(validate_job_id("123/456").is_err());
        assert!(validate_job_id("../jobs").is_err());
    }

    #[test]
    fn validate_job_id_rejects_overlong() {
        assert!(validate_job_id(&"9".repeat(MAX_JOB_ID_CHARS + 1)).is_err());
    }
}
