//! Input preparation and response-part processing around a model call.
//!
//! Both halves are synchronous and CPU/disk bound; the server runs them on the
//! blocking pool.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::codec;
use crate::error::Result;
use crate::gemini::{GenerationRequest, InputImage, ModelPart};
use crate::storage::OutputStore;

/// Uploads normalised to PNG and ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInputs {
    /// The caller's photo, re-encoded as PNG.
    pub photo_png: Vec<u8>,
    /// The reference image as PNG, or `None` if absent or unreadable.
    pub reference_png: Option<Vec<u8>>,
}

impl PreparedInputs {
    /// Assemble the model request: prompt, photo, then the reference if any.
    pub fn into_request(self, prompt: String) -> GenerationRequest {
        let mut images = vec![InputImage::png(self.photo_png)];
        if let Some(reference) = self.reference_png {
            images.push(InputImage::png(reference));
        }
        GenerationRequest { prompt, images }
    }
}

/// Decode the uploads.
///
/// The photo must be a readable image. An unreadable reference is dropped
/// with a warning and the request continues with the photo alone.
pub fn prepare_inputs(photo: &[u8], reference: Option<&[u8]>) -> Result<PreparedInputs> {
    let photo_png = codec::to_png(photo, "photo")?;

    let reference_png = match reference.map(|bytes| codec::to_png(bytes, "reference")) {
        None => None,
        Some(Ok(png)) => Some(png),
        Some(Err(e)) => {
            warn!(error = %e, "ignoring unreadable reference image");
            None
        }
    };

    Ok(PreparedInputs {
        photo_png,
        reference_png,
    })
}

/// What the model produced, ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Concatenation of every text part.
    pub generated_text: String,
    /// Base64 of the last image part, if any.
    pub image_base64: Option<String>,
    /// Files written to the output store, in order.
    pub saved: Vec<PathBuf>,
}

/// Walk the response parts in order.
///
/// Text parts accumulate. Image parts that decode are saved to `store` and
/// returned as base64 PNG. Image parts that do not decode, or that cannot be
/// saved, are returned as base64 of their raw bytes.
pub fn process_parts(parts: Vec<ModelPart>, store: &OutputStore) -> GenerationOutcome {
    let mut outcome = GenerationOutcome::default();

    for part in parts {
        if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
            outcome.generated_text.push_str(text);
        } else if let Some(inline) = part.inline_data {
            match codec::decode(&inline.data) {
                Ok(img) => match store.save_png(&img) {
                    Ok((path, png)) => {
                        outcome.image_base64 = Some(codec::to_base64(&png));
                        outcome.saved.push(path);
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            dir = %store.dir().display(),
                            "could not save generated image; returning raw bytes"
                        );
                        outcome.image_base64 = Some(codec::to_base64(&inline.data));
                    }
                },
                Err(e) => {
                    warn!(
                        error = %e,
                        mime_type = %inline.mime_type,
                        bytes = inline.data.len(),
                        "generated image did not decode; returning raw bytes"
                    );
                    outcome.image_base64 = Some(codec::to_base64(&inline.data));
                }
            }
        } else {
            debug!("skipping empty response part");
        }
    }

    outcome
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::test::sample_png;
    use crate::error::CoreError;

    #[test]
    fn prepare_keeps_readable_reference() {
        let inputs = prepare_inputs(&sample_png(), Some(&sample_png())).unwrap();
        assert!(inputs.reference_png.is_some());

        let req = inputs.into_request("p".into());
        assert_eq!(req.prompt, "p");
        assert_eq!(req.images.len(), 2);
        assert!(req.images.iter().all(|i| i.mime_type == "image/png"));
    }

    #[test]
    fn prepare_drops_unreadable_reference() {
        let inputs = prepare_inputs(&sample_png(), Some(b"garbage")).unwrap();
        assert!(inputs.reference_png.is_none());
        assert_eq!(inputs.into_request(String::new()).images.len(), 1);
    }

    #[test]
    fn prepare_rejects_unreadable_photo() {
        let err = prepare_inputs(b"garbage", None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidImage { what: "photo", .. }));
    }

    #[test]
    fn image_only_response_is_saved_and_encoded() {
        let temp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(temp.path().join("generated images"));

        let parts = vec![ModelPart::image("image/png", sample_png())];
        let outcome = process_parts(parts, &store);

        assert_eq!(outcome.generated_text, "");
        assert_eq!(outcome.saved.len(), 1);
        assert!(outcome.saved[0].ends_with("generated_image1.png"));
        let saved = std::fs::read(&outcome.saved[0]).unwrap();
        assert_eq!(outcome.image_base64.as_deref(), Some(codec::to_base64(&saved).as_str()));
    }

    #[test]
    fn text_parts_accumulate_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(temp.path());

        let parts = vec![ModelPart::text("one "), ModelPart::default(), ModelPart::text("two")];
        let outcome = process_parts(parts, &store);

        assert_eq!(outcome.generated_text, "one two");
        assert_eq!(outcome.image_base64, None);
        assert!(outcome.saved.is_empty());
    }

    #[test]
    fn undecodable_image_falls_back_to_raw_bytes() {
        let temp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(temp.path().join("out"));

        let raw = b"\x00\x01not-a-png".to_vec();
        let outcome = process_parts(vec![ModelPart::image("image/png", raw.clone())], &store);

        assert_eq!(outcome.image_base64, Some(codec::to_base64(&raw)));
        assert!(outcome.saved.is_empty());
        assert!(!store.dir().exists());
    }

    #[test]
    fn save_failure_falls_back_to_raw_bytes() {
        let temp = tempfile::tempdir().unwrap();
        let occupied = temp.path().join("generated images");
        std::fs::write(&occupied, b"not a directory").unwrap();
        let store = OutputStore::new(occupied.clone());

        let raw = sample_png();
        let parts = vec![ModelPart::text("here you go"), ModelPart::image("image/png", raw.clone())];
        let outcome = process_parts(parts, &store);

        assert_eq!(outcome.generated_text, "here you go");
        assert_eq!(outcome.image_base64, Some(codec::to_base64(&raw)));
        assert!(outcome.saved.is_empty());
        assert!(occupied.is_file());
    }

    #[test]
    fn empty_inline_payload_yields_empty_base64() {
        let temp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(temp.path());
        let outcome = process_parts(vec![ModelPart::image("image/png", Vec::new())], &store);
        assert_eq!(outcome.image_base64.as_deref(), Some(""));
    }

    #[test]
    fn empty_text_with_image_uses_image_branch() {
        let temp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(temp.path());
        let part = ModelPart {
            text: Some(String::new()),
            ..ModelPart::image("image/png", sample_png())
        };
        let outcome = process_parts(vec![part], &store);
        assert_eq!(outcome.saved.len(), 1);
    }

    #[test]
    fn last_image_wins_and_every_image_is_saved() {
        let temp = tempfile::tempdir().unwrap();
        let store = OutputStore::new(temp.path());

        let parts = vec![
            ModelPart::image("image/png", sample_png()),
            ModelPart::image("image/png", b"raw".to_vec()),
            ModelPart::image("image/png", sample_png()),
        ];
        let outcome = process_parts(parts, &store);

        assert_eq!(outcome.saved.len(), 2);
        assert!(outcome.saved[1].ends_with("generated_image2.png"));
        assert_ne!(outcome.image_base64, Some(codec::to_base64(b"raw")));
    }
}
