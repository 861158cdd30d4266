#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use gtexquery::error::GtexError;
use gtexquery::session::{TextResponse, Transport};

pub const GTEX_RESPONSE: &str = "
gencodeId\tgeneSymbol\ttissueSiteDetailId\ttranscriptId\tmedian\tunit\tdatasetId
ENSG00000144355.14\tDLX1\tBrain_Hypothalamus\tENST00000341900.6\t5.184999942779541\tread count\tgtex_v8
ENSG00000144355.14\tDLX1\tBrain_Hypothalamus\tENST00000361609.4\t0.23999999463558197\tread count\tgtex_v8
ENSG00000144355.14\tDLX1\tBrain_Hypothalamus\tENST00000361725.4\t3.1599998474121094\tread count\tgtex_v8
ENSG00000144355.14\tDLX1\tBrain_Hypothalamus\tENST00000409492.1\t1.2300000190734863\tread count\tgtex_v8
ENSG00000144355.14\tDLX1\tBrain_Hypothalamus\tENST00000469444.6\t0.0\tread count\tgtex_v8
ENSG00000144355.14\tDLX1\tBrain_Hypothalamus\tENST00000475989.2\t1.225000023841858\tread count\tgtex_v8
ENSG00000144355.14\tDLX1\tBrain_Hypothalamus\tENST00000550686.1\t0.4699999988079071\tread count\tgtex_v8
";

pub const BIOMART_RESPONSE: &str = "
HGNC symbol\tGene stable ID\tTranscript stable ID\tRefSeq mRNA ID
DLX1\tENSG00000144355\tENST00000341900\tNM_001038493
DLX1\tENSG00000144355\tENST00000361725\tNM_178120
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct MockState {
    responses: HashMap<String, VecDeque<TextResponse>>,
    requests: Vec<RecordedRequest>,
}

/// Serves queued responses per URL and records every request.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        let mut state = self.state.lock().unwrap();
        state
            .responses
            .entry(url.to_string())
            .or_default()
            .push_back(TextResponse {
                status,
                url: url.to_string(),
                body: body.to_string(),
            });
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<TextResponse, GtexError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(RecordedRequest {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        });
        let response = state
            .responses
            .get_mut(url)
            .and_then(|queue| queue.pop_front());
        Ok(response.unwrap_or(TextResponse {
            status: 404,
            url: url.to_string(),
            body: "no mock response".to_string(),
        }))
    }
}
