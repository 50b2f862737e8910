use std::{path::PathBuf, sync::mpsc, thread};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Handle to the SQLite worker thread. Every task runs on that single thread,
/// so a task that reads, mutates and writes a row cannot interleave with
/// another one. The worker exits once the last handle is dropped.
#[derive(Clone)]
pub struct Database {
    sender: mpsc::Sender<DbTask>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let database = Self::spawn(Some(db_path.clone()))?;
        info!("Database initialized at {}", db_path.display());
        Ok(database)
    }

    /// Non-durable database for tests.
    pub fn in_memory() -> Result<Self> {
        Self::spawn(None)
    }

    fn open(path: Option<&PathBuf>) -> Result<Connection> {
        let conn = match path {
            Some(path) => {
                let conn = Connection::open(path)?;
                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                conn
            }
            None => Connection::open_in_memory()?,
        };
        Ok(conn)
    }

    fn spawn(path: Option<PathBuf>) -> Result<Self> {
        let (task_tx, task_rx) = mpsc::channel::<DbTask>();
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("travel-map-db".into())
            .spawn(move || {
                let mut conn = match Self::open(path.as_ref())
                    .context("failed to open SQLite database")
                {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    return;
                }

                while let Ok(task) = task_rx.recv() {
                    task(&mut conn);
                }
                info!("Database thread shutting down");
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        Ok(Self { sender: task_tx })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.sender
            .send(Box::new(move |conn| {
                if reply_tx.send(task(conn)).is_err() {
                    error!("DB caller dropped before receiving result");
                }
            }))
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}
