//! Simulate concurrent editors sharing one authority.
//!
//! Every round, each participant makes a random edit and submits it, then
//! reads at most one message. Reading lags behind writing on purpose so
//! submissions keep colliding. After the last round everyone drains until
//! the authority goes quiet, and the documents are compared.

use anyhow::{Context, Result};
use collab_client::{ClientConfig, ClientEvent, CollabClient, LoopbackAuthority, LoopbackTransport};
use collab_types::TextStep;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Duration;

type Participant = CollabClient<TextStep, LoopbackTransport<TextStep>>;

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct Options {
    /// Number of participants.
    pub clients: usize,
    /// Rounds of edits.
    pub rounds: usize,
    /// Seed for the random edits.
    pub seed: Option<u64>,
    /// Initial document.
    pub text: String,
    /// Client settings file.
    pub config: Option<PathBuf>,
}

/// Outcome of a simulation.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Seed actually used.
    pub seed: u64,
    /// Authoritative document at the end.
    pub authority_doc: String,
    /// Authoritative version at the end.
    pub authority_version: u64,
    /// Final document of each participant.
    pub docs: Vec<String>,
    /// Whether each participant ended with nothing pending at the final version.
    pub caught_up: Vec<bool>,
    /// Local edits made.
    pub edits: usize,
    /// Submissions refused as stale.
    pub rejections: usize,
    /// Local steps lost to conflicting remote edits.
    pub dropped: usize,
    /// Snapshots requested after protocol errors.
    pub resyncs: usize,
}

impl Report {
    /// True if every participant holds the authoritative document.
    pub fn converged(&self) -> bool {
        self.caught_up.iter().all(|&ok| ok)
            && self.docs.iter().all(|doc| *doc == self.authority_doc)
    }

    /// Print a summary to stdout.
    pub fn print(&self) {
        println!("=== collab-cli simulate ===");
        println!();
        println!("Seed:       {}", self.seed);
        println!("Edits:      {}", self.edits);
        println!("Version:    {}", self.authority_version);
        println!("Rejections: {}", self.rejections);
        println!("Dropped:    {}", self.dropped);
        println!("Resyncs:    {}", self.resyncs);
        println!();
        println!("Authority:  {:?}", self.authority_doc);
        for (i, (doc, ok)) in self.docs.iter().zip(&self.caught_up).enumerate() {
            let mark = if *ok && *doc == self.authority_doc {
                "ok"
            } else {
                "DIVERGED"
            };
            println!("Client {:<3} {:?} [{}]", i + 1, doc, mark);
        }
        println!();
        if self.converged() {
            println!("All participants converged.");
        }
    }

    fn record(&mut self, event: &ClientEvent) {
        match event {
            ClientEvent::Rejected { .. } => self.rejections += 1,
            ClientEvent::Applied { dropped, .. } => self.dropped += dropped,
            ClientEvent::ResyncRequested { .. } => self.resyncs += 1,
            _ => {}
        }
    }
}

/// Run the simulate command.
pub async fn run(options: &Options) -> Result<Report> {
    let base = match &options.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ClientConfig::default().with_poll_timeout(Duration::from_millis(5)),
    };
    let seed = options.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    tracing::info!(
        seed,
        clients = options.clients,
        rounds = options.rounds,
        "starting simulation"
    );

    let authority = LoopbackAuthority::<TextStep>::new(options.text.clone());
    let mut participants = Vec::with_capacity(options.clients);
    for i in 0..options.clients {
        // Ids and versions are per participant; only transport settings are shared.
        let config = base
            .clone()
            .with_client_id(i as u32 + 1)
            .with_start_version(authority.version().value());
        let client = Participant::new(config, authority.doc(), authority.transport())
            .context("Failed to create participant")?;
        client.connect().await?;
        participants.push(client);
    }

    let mut report = Report {
        seed,
        ..Report::default()
    };

    for _ in 0..options.rounds {
        for client in &participants {
            let doc = client.doc().await;
            client.edit(vec![random_edit(&mut rng, &doc)]).await?;
            report.edits += 1;
            client.flush().await?;
        }
        for client in &participants {
            if let Some(event) = client.poll_timeout().await? {
                report.record(&event);
            }
        }
    }

    let max_passes = 4 * (options.rounds + 1) * (options.clients + 1);
    settle(&participants, &mut report, max_passes).await?;

    report.authority_doc = authority.doc();
    report.authority_version = authority.version().value();
    for client in &participants {
        report.docs.push(client.doc().await);
        report
            .caught_up
            .push(client.is_synced().await && client.version().await == authority.version());
    }
    tracing::info!(
        version = report.authority_version,
        converged = report.converged(),
        "simulation finished"
    );
    Ok(report)
}

/// Flush and drain every participant until a full pass receives nothing.
async fn settle(
    participants: &[Participant],
    report: &mut Report,
    max_passes: usize,
) -> Result<()> {
    for _ in 0..max_passes {
        let mut quiet = true;
        for client in participants {
            client.flush().await?;
            while let Some(event) = client.poll_timeout().await? {
                report.record(&event);
                quiet = false;
            }
        }
        if quiet {
            return Ok(());
        }
    }
    tracing::warn!(max_passes, "participants still busy, giving up");
    Ok(())
}

/// A random insert, delete or replace that fits `doc`.
fn random_edit(rng: &mut impl Rng, doc: &str) -> TextStep {
    let len = doc.chars().count();
    let from = rng.gen_range(0..=len);
    let to = (from + rng.gen_range(0..=3)).min(len);

    match rng.gen_range(0..10) {
        0..=4 => TextStep::insert(from, random_word(rng)),
        5..=7 if to > from => TextStep::delete(from, to),
        _ => TextStep::replace(from, to, random_word(rng)),
    }
}

fn random_word(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(1..=3);
    (0..len)
        .map(|_| (b'a' + rng.gen_range(0..26u8)) as char)
        .collect()
}
