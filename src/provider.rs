use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use tracing::debug;

use crate::api::PredictorApi;
use crate::logo::resolve_logo_job;
use crate::state::{Delta, PredictionRequest, ProviderCommand};

/// Runs every command as its own job on a small pool. Jobs from separate
/// commands may overlap; the generation carried in each report lets the
/// state drop results from superseded commands.
pub fn spawn_provider(
    api: Arc<dyn PredictorApi>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    workers: usize,
) {
    thread::spawn(move || {
        let pool = build_fetch_pool(workers);
        while let Ok(cmd) = cmd_rx.recv() {
            let api = Arc::clone(&api);
            let tx = tx.clone();
            let job = move || run_command(api.as_ref(), cmd, &tx);
            if let Some(pool) = pool.as_ref() {
                pool.spawn(job);
            } else {
                thread::spawn(job);
            }
        }
        debug!("command channel closed, provider exiting");
    });
}

pub fn run_command(api: &dyn PredictorApi, cmd: ProviderCommand, tx: &Sender<Delta>) {
    match cmd {
        ProviderCommand::FetchTeams => match api.teams() {
            Ok(teams) => {
                let _ = tx.send(Delta::SetTeams(teams));
            }
            Err(err) => {
                let _ = tx.send(Delta::TeamsFailed(format!("{err:#}")));
            }
        },
        ProviderCommand::Predict {
            generation,
            request,
        } => run_prediction_job(api, generation, &request, tx),
        ProviderCommand::ResolveLogo {
            slot,
            generation,
            team,
        } => resolve_logo_job(api, slot, generation, &team, tx),
        ProviderCommand::FetchPredictionList => match api.predictions() {
            Ok(listing) => {
                let _ = tx.send(Delta::SetPredictionList(listing));
            }
            Err(err) => {
                let _ = tx.send(Delta::PredictionListFailed(format!("{err:#}")));
            }
        },
    }
}

/// Prediction then details, strictly in that order. Details are only asked
/// for once the prediction has come back successfully.
pub fn run_prediction_job(
    api: &dyn PredictorApi,
    generation: u64,
    request: &PredictionRequest,
    tx: &Sender<Delta>,
) {
    let prediction = api.predict(request);
    let succeeded = prediction.is_ok();
    let _ = tx.send(Delta::PredictionSettled {
        generation,
        result: prediction.map_err(|err| format!("{err:#}")),
    });
    if !succeeded {
        return;
    }

    let details = api.match_details(request);
    let _ = tx.send(Delta::DetailsSettled {
        generation,
        result: details.map_err(|err| format!("{err:#}")),
    });
}

fn build_fetch_pool(workers: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.clamp(1, 16))
        .thread_name(|i| format!("fc-fetch-{i}"))
        .build()
        .ok()
}
