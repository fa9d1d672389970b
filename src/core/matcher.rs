use crate::common::{FaceMatchError, Result};
use serde::{Deserialize, Serialize};

/// Anything that can stand in a candidate list: an identifier plus an optional embedding.
pub trait Candidate {
    fn identifier(&self) -> &str;

    /// `None` and an empty slice both mean "not enrolled".
    fn embedding(&self) -> Option<&[f32]>;
}

/// Best candidate found by [`best_match`] together with its cosine distance.
#[derive(Debug)]
pub struct FaceMatch<'a, C> {
    pub candidate: &'a C,
    pub distance: f32,
}

impl<C> FaceMatch<'_, C> {
    /// Display confidence, `1 - distance`.
    pub fn confidence(&self) -> f32 {
        1.0 - self.distance
    }
}

// Manual impls so `C` need not be Clone/Copy itself.
impl<C> Clone for FaceMatch<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for FaceMatch<'_, C> {}

/// Transport-friendly view of a match outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl<C: Candidate> From<Option<FaceMatch<'_, C>>> for MatchSummary {
    fn from(found: Option<FaceMatch<'_, C>>) -> Self {
        match found {
            Some(m) => MatchSummary {
                matched: true,
                identifier: Some(m.candidate.identifier().to_string()),
                distance: Some(m.distance),
            },
            None => MatchSummary { matched: false, identifier: None, distance: None },
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(FaceMatchError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

/// `1 - cosine_similarity`, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    Ok(1.0 - cosine_similarity(a, b)?)
}

/// Scans `candidates` in order and returns the closest one strictly under `threshold`.
///
/// Candidates without an embedding are skipped. Ties keep the earliest
/// candidate. A stored embedding whose length differs from `query` fails the
/// whole scan with [`FaceMatchError::DimensionMismatch`].
pub fn best_match<'a, C: Candidate>(
    query: &[f32],
    candidates: &'a [C],
    threshold: f32,
) -> Result<Option<FaceMatch<'a, C>>> {
    let mut best: Option<FaceMatch<'a, C>> = None;
    let mut min_distance = f32::INFINITY;

    for candidate in candidates {
        let stored = match candidate.embedding() {
            Some(stored) if !stored.is_empty() => stored,
            _ => continue,
        };

        let distance = cosine_distance(query, stored).map_err(|e| {
            tracing::error!(
                "Stored embedding for {} is unusable: {}",
                candidate.identifier(),
                e
            );
            e
        })?;
        tracing::debug!("Candidate {}: distance {:.4}", candidate.identifier(), distance);

        if distance < threshold && distance < min_distance {
            min_distance = distance;
            best = Some(FaceMatch { candidate, distance });
        }
    }

    Ok(best)
}
