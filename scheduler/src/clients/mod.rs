pub mod calendar;
mod http;
pub mod prerecordings;
pub mod records;
pub mod reserve;

use std::sync::Arc;

use crate::config::Config;

use calendar::CalendarClient;
use prerecordings::PrerecordingsClient;
use records::RecordsClient;
use reserve::ReserveClient;

/// Every outbound HTTP dependency, bundled so it can be shared as a
/// single `Arc` across the API server, the stream operation and the
/// synchronizers.
pub struct Clients {
    pub calendar: CalendarClient,
    pub records: RecordsClient,
    pub prerecordings: PrerecordingsClient,
    pub reserve: ReserveClient,
}

impl Clients {
    pub fn new(config: &Config) -> Arc<Self> {
        let http = reqwest::Client::new();
        Arc::new(Self {
            calendar: CalendarClient::new(http.clone(), config.emishows.clone()),
            records: RecordsClient::new(http.clone(), config.emirecords.clone()),
            prerecordings: PrerecordingsClient::new(http.clone(), config.datarecords.clone()),
            reserve: ReserveClient::new(http, config.emistream.clone()),
        })
    }
}
