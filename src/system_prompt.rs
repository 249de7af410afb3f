//! System prompt construction and reference dataset loading
//!
//! The chat endpoint grounds every reply in a handful of CSV files read from
//! the data directory at start-up. Each attached file gets its own paragraph
//! in the system prompt telling the model what it is for.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Datasets that must be present for the chat endpoint to start
pub const REQUIRED_DATASETS: [&str; 3] = ["cuet_data.csv", "links.csv", "list.csv"];

/// Optional dataset with recent announcements
pub const UPDATES_DATASET: &str = "cuet_updates.csv";

pub const CSV_MIME_TYPE: &str = "text/csv";

/// Base system prompt establishing the assistant's role
const BASE_PROMPT: &str = r"You are a helpful assistant that determines CUET course eligibility based on exam attempts.
Be concise and provide a quick response. Focus on the essential details to determine eligibility.
Avoid unnecessary elaboration.

Key instructions:
1. Understand CUET (Common University Entrance Test) eligibility criteria and how the number of attempts influences it.
2. Provide quick, accurate eligibility assessments.
3. Do not mention which file or path any of your information comes from.
4. If a file is uploaded, analyze its content for any relevant eligibility-related data.";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("required dataset {name} not found at {}", path.display())]
    Missing { name: &'static str, path: PathBuf },
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One CSV file attached to every chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Dataset {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// What the model should do with a file
fn instruction_for(name: &str) -> &'static str {
    match name {
        "cuet_data.csv" => "Please analyze the contents of this file and always incorporate relevant information into your responses.",
        "links.csv" => "In your responses, in addition to the CUET criteria, please also add links to relevant resources that can help the user understand the criteria and make informed decisions.",
        "list.csv" => "In your responses, in addition to the CUET criteria, please also analyze within this list resources that can help the user understand the criteria and make informed decisions.",
        UPDATES_DATASET => "In your responses, go through this data before giving answers that are not in the other data.",
        _ => "Use it where relevant.",
    }
}

/// The reference datasets, in attachment order
///
/// The updates file is only ever mentioned in the prompt; it is never
/// attached.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    datasets: Vec<Dataset>,
    updates: bool,
}

impl ReferenceData {
    /// Load the required datasets and note whether the updates file exists
    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        let mut datasets = Vec::with_capacity(REQUIRED_DATASETS.len());
        for name in REQUIRED_DATASETS {
            let path = dir.join(name);
            if !path.is_file() {
                return Err(DatasetError::Missing { name, path });
            }
            datasets.push(read_dataset(name, path)?);
        }

        let updates = dir.join(UPDATES_DATASET).is_file();
        if !updates {
            tracing::debug!(dir = %dir.display(), "No updates dataset, skipping");
        }

        tracing::info!(
            dir = %dir.display(),
            count = datasets.len(),
            bytes = datasets.iter().map(|d| d.bytes.len()).sum::<usize>(),
            updates,
            "Loaded reference datasets"
        );
        Ok(Self { datasets, updates })
    }

    pub fn from_datasets(datasets: Vec<Dataset>) -> Self {
        Self {
            datasets,
            updates: false,
        }
    }

    #[cfg(test)]
    pub fn with_updates(mut self) -> Self {
        self.updates = true;
        self
    }

    /// Files sent inline with every request
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn has_updates(&self) -> bool {
        self.updates
    }
}

fn read_dataset(name: &str, path: PathBuf) -> Result<Dataset, DatasetError> {
    let bytes = std::fs::read(&path).map_err(|source| DatasetError::Io { path, source })?;
    Ok(Dataset {
        name: name.to_string(),
        bytes,
    })
}

/// Greeting the model should open with for a UI theme
fn greeting_for_theme(theme: &str) -> &'static str {
    if theme.eq_ignore_ascii_case("dark") {
        "Good evening"
    } else {
        "Good day"
    }
}

/// Build the complete system prompt for one chat request.
pub fn build_system_prompt(theme: &str, username: &str, data: &ReferenceData) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    let greeting = greeting_for_theme(theme);
    let _ = write!(
        prompt,
        "\n\nThe user interface is currently in {theme} mode. Greet the user with \"{greeting}\" when greeting is appropriate."
    );
    let _ = write!(
        prompt,
        "\n\nThe current user's username is {username}. Use this information to personalize your responses when appropriate."
    );

    let names = data.datasets().iter().map(|d| d.name.as_str());
    let updates = data.has_updates().then_some(UPDATES_DATASET);
    for name in names.chain(updates) {
        let _ = write!(
            prompt,
            "\n\nA file has been uploaded. The file name is {name}. {}",
            instruction_for(name)
        );
    }

    prompt
}
