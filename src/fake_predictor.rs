use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ReconcileError;
use crate::model::{GameRequest, Prediction, YardSplit};
use crate::predictor::Predictor;

/// Offline predictor for demos. The RNG is seeded from the request so the same
/// matchup always gets the same numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakePredictor;

impl Predictor for FakePredictor {
    fn predict(&self, request: &GameRequest) -> Result<Prediction, ReconcileError> {
        let mut rng = StdRng::seed_from_u64(request_seed(request));

        let home_points = round1(rng.gen_range(13.0..42.0) + 2.5);
        let away_points = round1(rng.gen_range(13.0..42.0));
        let confidence = round1(rng.gen_range(52.0..88.0));

        Ok(Prediction {
            home_points,
            away_points,
            confidence: Some(confidence),
            home_yards: fake_yards(&mut rng),
            away_yards: fake_yards(&mut rng),
        })
    }
}

fn fake_yards(rng: &mut StdRng) -> YardSplit {
    let rushing = rng.gen_range(90.0..240.0_f64).round();
    let passing = rng.gen_range(150.0..340.0_f64).round();
    YardSplit::new(Some(rushing), Some(passing)).with_total()
}

// FNV-1a over season and case-folded names.
fn request_seed(request: &GameRequest) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let key = format!(
        "{}|{}|{}",
        request.season,
        request.home_team.trim().to_lowercase(),
        request.away_team.trim().to_lowercase()
    );
    for byte in key.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
