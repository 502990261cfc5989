//! Ground-truth counts for the bundled sample plates, and the remote library
//! those samples are fetched from.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_SAMPLE_BASE: &str = "https://github.com/arnaud-dg/CFU-counter/assets/sample/";

/// Sample pictures published alongside the model
pub const SAMPLE_NAMES: [&str; 8] = [
    "test.jpg",
    "test_2.jpg",
    "test_3.jpg",
    "test_4.jpg",
    "test_5.jpg",
    "test_6.jpg",
    "test_7.jpg",
    "test_8.jpg",
];

/// Tolerance for a "close" count, as a fraction of the real count
const CLOSE_TOLERANCE: f64 = 0.05;

#[derive(Debug, Deserialize)]
struct SampleRow {
    image_name: String,
    result: u32,
}

/// Known sample filenames mapped to their hand-counted CFU totals
#[derive(Debug, Clone, Default)]
pub struct SampleCounts {
    counts: HashMap<String, u32>,
}

impl SampleCounts {
    /// Read a `;`-delimited table with header `image_name;result`
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut counts = HashMap::new();
        for row in csv_reader.deserialize::<SampleRow>() {
            let row = row?;
            // First row for a name wins
            counts.entry(row.image_name).or_insert(row.result);
        }
        debug!(samples = counts.len(), "loaded sample counts");
        Ok(Self { counts })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn lookup(&self, image_name: &str) -> Option<u32> {
        self.counts.get(image_name).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// How a predicted count compares with the real one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountVerdict {
    PerfectMatch,
    /// Within 5% either side
    Close,
    Mismatch,
}

impl CountVerdict {
    pub fn compare(predicted: usize, real: u32) -> Self {
        let predicted_f = predicted as f64;
        let real_f = real as f64;
        if predicted as u64 == real as u64 {
            CountVerdict::PerfectMatch
        } else if predicted_f >= real_f * (1.0 - CLOSE_TOLERANCE)
            && predicted_f <= real_f * (1.0 + CLOSE_TOLERANCE)
        {
            CountVerdict::Close
        } else {
            CountVerdict::Mismatch
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            CountVerdict::PerfectMatch => "It's a perfect match!",
            CountVerdict::Close => "Model is pretty close! (+/-5%)",
            CountVerdict::Mismatch => "It's not a match! Model must be optimized.",
        }
    }
}

/// Remote directory of sample plate pictures
#[derive(Debug, Clone)]
pub struct SampleLibrary {
    client: Client,
    base_url: String,
}

impl SampleLibrary {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn names(&self) -> &'static [&'static str] {
        &SAMPLE_NAMES
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }

    /// Download one sample picture
    pub async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.url_for(name);
        debug!(%url, "fetching sample");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: format!("failed to load sample {}", name),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
