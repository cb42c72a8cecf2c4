use crate::export::Exporter;
use crate::platform::PrintHost;
use crate::session::{EditingSession, ImageOutcome, PendingImageRequest, SessionSnapshot, SettleResult};
use crate::{Error, ImageGateway, PosterPatch, PosterRecord, Result};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

type SettleReply = Box<dyn FnOnce(SettleResult) + Send>;

enum Command {
    Update(PosterPatch, oneshot::Sender<PosterRecord>),
    Generate(String, oneshot::Sender<SettleResult>),
    Edit(String, oneshot::Sender<Option<SettleResult>>),
    Settle(ImageOutcome, SettleReply),
    Import(PathBuf, oneshot::Sender<Result<PosterRecord>>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    ExportImage(PathBuf, oneshot::Sender<Option<PathBuf>>),
    Print(Arc<dyn PrintHost>, oneshot::Sender<()>),
    Close(oneshot::Sender<PosterRecord>),
    Shutdown,
}

/// Stops the worker once the last `Studio` clone is gone.
struct Handle {
    cmd_tx: Sender<Command>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }
}

/// An async-friendly poster studio backed by a dedicated worker thread.
///
/// The worker thread owns the [`EditingSession`] and applies commands in the
/// order they arrive. Gateway calls run on short-lived threads so edits to
/// the text fields are never blocked by a slow image request; their outcomes
/// come back to the worker as settle commands, where only the most recently
/// dispatched request may replace the featured image.
#[derive(Clone)]
pub struct Studio {
    inner: Arc<Handle>,
}

impl Studio {
    /// Spawn the worker with a fresh session seeded from `record`.
    pub fn new<G>(gateway: G, exporter: Exporter, record: PosterRecord) -> Self
    where
        G: ImageGateway + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let loop_tx = cmd_tx.clone();
        let session = EditingSession::with_record(Arc::new(gateway), record);

        thread::spawn(move || run_worker(session, exporter, loop_tx, cmd_rx));

        Self {
            inner: Arc::new(Handle { cmd_tx }),
        }
    }

    /// Build the Gemini gateway and exporter from `config` on the worker
    /// side and wait for them to come up.
    #[cfg(feature = "gemini")]
    pub async fn from_config(config: crate::StudioConfig) -> Result<Self> {
        let (init_tx, init_rx) = oneshot::channel::<Result<(crate::gemini::GeminiGateway, Exporter)>>();

        // reqwest's blocking client must not be built inside the async runtime
        thread::spawn(move || {
            let built = crate::gemini::GeminiGateway::new(config.clone())
                .and_then(|gateway| Exporter::new(&config).map(|exporter| (gateway, exporter)));
            let _ = init_tx.send(built);
        });

        let (gateway, exporter) = init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))??;
        Ok(Self::new(gateway, exporter, PosterRecord::default()))
    }

    fn send(&self, cmd: Command) {
        let _ = self.inner.cmd_tx.send(cmd);
    }

    /// Merge a partial update into the record and return the result.
    pub async fn update_fields(&self, patch: PosterPatch) -> Result<PosterRecord> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Update(patch, tx));
        rx.await
            .map_err(|e| Error::Other(format!("Update canceled: {}", e)))
    }

    /// Generate a new featured image for the current title and subtitle.
    pub async fn generate_background(&self, style: &str) -> Result<SettleResult> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Generate(style.to_string(), tx));
        rx.await
            .map_err(|e| Error::Other(format!("Generate canceled: {}", e)))
    }

    /// Edit the current featured image. `None` when the instruction is blank.
    pub async fn edit_image(&self, instruction: &str) -> Result<Option<SettleResult>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Edit(instruction.to_string(), tx));
        rx.await
            .map_err(|e| Error::Other(format!("Edit canceled: {}", e)))
    }

    /// Replace the featured image with a local file.
    pub async fn import_local_file(&self, path: impl Into<PathBuf>) -> Result<PosterRecord> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Import(path.into(), tx));
        rx.await
            .map_err(|e| Error::Other(format!("Import canceled: {}", e)))?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Snapshot canceled: {}", e)))
    }

    /// Write the JPEG export into `dir`. `None` means the export failed and
    /// the session error was set.
    pub async fn export_image(&self, dir: impl Into<PathBuf>) -> Result<Option<PathBuf>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::ExportImage(dir.into(), tx));
        rx.await
            .map_err(|e| Error::Other(format!("Export canceled: {}", e)))
    }

    pub async fn print(&self, host: Arc<dyn PrintHost>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Print(host, tx));
        rx.await
            .map_err(|e| Error::Other(format!("Print canceled: {}", e)))
    }

    /// Stop the worker and return the final record. In-flight image
    /// requests are abandoned.
    pub async fn close(self) -> Result<PosterRecord> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))
    }
}

fn spawn_request<G>(pending: PendingImageRequest, gateway: Arc<G>, loop_tx: Sender<Command>, reply: SettleReply)
where
    G: ImageGateway + 'static,
{
    let token = pending.token();
    thread::spawn(move || {
        log::debug!("image request {} started", token.value());
        let outcome = pending.run(gateway.as_ref());
        let _ = loop_tx.send(Command::Settle(outcome, reply));
    });
}

fn run_worker<G>(
    mut session: EditingSession<Arc<G>>,
    exporter: Exporter,
    loop_tx: Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
) where
    G: ImageGateway + 'static,
{
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Command::Update(patch, resp) => {
                session.update_fields(&patch);
                let _ = resp.send(session.record().clone());
            }
            Command::Generate(style, resp) => {
                let pending = session.begin_generation(&style);
                let reply: SettleReply = Box::new(move |res| {
                    let _ = resp.send(res);
                });
                spawn_request(pending, Arc::clone(session.gateway()), loop_tx.clone(), reply);
            }
            Command::Edit(instruction, resp) => match session.begin_edit(&instruction) {
                Some(pending) => {
                    let reply: SettleReply = Box::new(move |res| {
                        let _ = resp.send(Some(res));
                    });
                    spawn_request(pending, Arc::clone(session.gateway()), loop_tx.clone(), reply);
                }
                None => {
                    let _ = resp.send(None);
                }
            },
            Command::Settle(outcome, reply) => {
                let token = outcome.token;
                let res = session.settle(outcome);
                log::debug!("image request {} settled: {:?}", token.value(), res);
                reply(res);
            }
            Command::Import(path, resp) => {
                let res = session
                    .import_local_file(&path)
                    .map(|_| session.record().clone());
                let _ = resp.send(res);
            }
            Command::Snapshot(resp) => {
                let _ = resp.send(session.snapshot());
            }
            Command::ExportImage(dir, resp) => {
                let _ = resp.send(session.export_as_image(&exporter, &dir));
            }
            Command::Print(host, resp) => {
                session.export_as_print(&exporter, host.as_ref());
                let _ = resp.send(());
            }
            Command::Close(resp) => {
                let _ = resp.send(session.record().clone());
                break;
            }
            Command::Shutdown => break,
        }
    }
    log::debug!("studio worker stopped");
}
