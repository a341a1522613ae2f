use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::predictor::Predictor;
use crate::reconcile::{CancelToken, PredictionReconciler};
use crate::schedule::ScheduleSource;
use crate::state::{Delta, ProviderCommand};

/// Background thread that owns the reconciler. Each request runs on its own
/// thread so a slow predictor never blocks a cancel.
pub fn spawn_reconcile_worker<P, S>(
    reconciler: Arc<PredictionReconciler<P, S>>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> thread::JoinHandle<()>
where
    P: Predictor + 'static,
    S: ScheduleSource + 'static,
{
    thread::spawn(move || {
        let mut tokens: HashMap<u64, CancelToken> = HashMap::new();

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::Reconcile {
                    generation,
                    request,
                } => {
                    // Only one request is ever live; older ones are abandoned.
                    for token in tokens.values() {
                        token.cancel();
                    }
                    tokens.clear();

                    let token = CancelToken::new();
                    tokens.insert(generation, token.clone());
                    let reconciler = Arc::clone(&reconciler);
                    let tx = tx.clone();
                    thread::spawn(move || {
                        let _ = tx.send(Delta::Log(format!(
                            "[INFO] Predicting {} vs {} ({})",
                            request.home_team, request.away_team, request.season
                        )));
                        let delta = match reconciler.reconcile_with_cancel(&request, &token) {
                            Ok(result) => Delta::Reconciled {
                                generation,
                                result: Box::new(result),
                            },
                            Err(error) => Delta::Failed { generation, error },
                        };
                        let _ = tx.send(delta);
                    });
                }
                ProviderCommand::Cancel { generation } => {
                    if let Some(token) = tokens.remove(&generation) {
                        token.cancel();
                    }
                }
            }
        }

        for token in tokens.values() {
            token.cancel();
        }
    })
}
