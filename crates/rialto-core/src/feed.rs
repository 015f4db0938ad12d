//! Remote feed adapter.
//!
//! The feed is a single GET endpoint multiplexed by the `t` query
//! parameter, with `a`/`a2` carrying request arguments. Replies are
//! `,`/`;`/`@`-structured text, no envelopes. This module shapes requests
//! and decodes the instrument-side replies; closing-price bodies are
//! returned raw because their validation belongs to the synchronizer's
//! retry loop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::{HttpClient, HttpRequest};
use crate::{DEven, FeedError, InsCode, Instrument, ShareEvent};

/// Public endpoint of the exchange's TseClient service.
pub const DEFAULT_BASE_URL: &str = "http://service.tsetmc.com/tsev2/data/TseClient2.aspx";

/// Busy sentinel: the feed answers `*` when its instrument tables are
/// being rebuilt server-side.
const BUSY_MARKER: &str = "*";

/// One worklist entry of a closing-prices call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEntry {
    pub ins_code: InsCode,
    /// Last archived date for the code; `DEven::ZERO` requests full history.
    pub last_deven: DEven,
    /// Market flag of the instrument (0 or 1), echoed to the feed.
    pub flag: u8,
}

impl SyncEntry {
    fn as_triple(&self) -> String {
        format!("{},{},{}", self.ins_code, self.last_deven, self.flag)
    }
}

/// Reply of the instruments delta call.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentsReply {
    /// Empty body: the archive is already current.
    Current,
    /// `*` body: tables busy server-side, try again later.
    Busy,
    Rows(Vec<Instrument>),
}

/// Reply of the combined instruments-and-shares delta call.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentSharesReply {
    Busy,
    Data {
        instruments: Vec<Instrument>,
        shares: Vec<ShareEvent>,
    },
}

/// Price-feed seam consumed by the synchronizer. Implementations return
/// the raw reply body; protocol validation happens at the call site so a
/// malformed body can be retried like a transport failure.
pub trait PriceFeed: Send + Sync {
    fn closing_prices<'a>(
        &'a self,
        entries: Vec<SyncEntry>,
    ) -> Pin<Box<dyn Future<Output = Result<String, FeedError>> + Send + 'a>>;
}

/// Adapter over the TseClient-style endpoint.
#[derive(Clone)]
pub struct TsetmcFeed {
    base_url: String,
    http: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl TsetmcFeed {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            http,
            timeout_ms: 30_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn url(&self, t: &str, a: Option<&str>, a2: Option<&str>) -> String {
        let mut url = format!("{}?t={}", self.base_url, urlencoding::encode(t));
        if let Some(a) = a {
            url.push_str("&a=");
            url.push_str(&urlencoding::encode(a));
        }
        if let Some(a2) = a2 {
            url.push_str("&a2=");
            url.push_str(&urlencoding::encode(a2));
        }
        url
    }

    async fn call(&self, t: &str, a: Option<&str>, a2: Option<&str>) -> Result<String, FeedError> {
        let request = HttpRequest::get(self.url(t, a, a2)).with_timeout_ms(self.timeout_ms);
        let response = self.http.get(request).await?;
        if !response.is_success() {
            return Err(FeedError::protocol(format!(
                "feed answered status {}",
                response.status
            )));
        }
        Ok(response.body)
    }

    /// Instruments changed since `last_deven` (all instruments when the
    /// archive is empty).
    pub async fn instruments(&self, last_deven: DEven) -> Result<InstrumentsReply, FeedError> {
        let a = last_deven.to_string();
        let body = self.call("Instrument", Some(&a), None).await?;
        let body = body.trim();

        if body.is_empty() {
            return Ok(InstrumentsReply::Current);
        }
        if body == BUSY_MARKER {
            return Ok(InstrumentsReply::Busy);
        }
        Ok(InstrumentsReply::Rows(parse_instrument_rows(body)?))
    }

    /// Combined delta: instruments changed since `last_deven` plus share
    /// events with id greater than `last_share_id`, split on `@`.
    pub async fn instruments_and_shares(
        &self,
        last_deven: DEven,
        last_share_id: u64,
    ) -> Result<InstrumentSharesReply, FeedError> {
        let a = last_deven.to_string();
        let a2 = last_share_id.to_string();
        let body = self
            .call("InstrumentAndShare", Some(&a), Some(&a2))
            .await?;
        let body = body.trim();

        if body == BUSY_MARKER {
            return Ok(InstrumentSharesReply::Busy);
        }

        let (instrument_part, share_part) = body.split_once('@').ok_or_else(|| {
            FeedError::protocol("instruments-and-shares reply is missing the @ separator")
        })?;

        let instruments = if instrument_part.is_empty() {
            Vec::new()
        } else {
            parse_instrument_rows(instrument_part)?
        };

        let mut shares = Vec::new();
        for row in share_part.split(';').filter(|row| !row.is_empty()) {
            shares.push(ShareEvent::parse_row(row).map_err(FeedError::from)?);
        }

        Ok(InstrumentSharesReply::Data {
            instruments,
            shares,
        })
    }

    /// Raw marker body of the last-possible-trading-date call. Decoded by
    /// the staleness oracle.
    pub async fn last_possible_deven(&self) -> Result<String, FeedError> {
        self.call("LastPossibleDeven", None, None).await
    }
}

impl PriceFeed for TsetmcFeed {
    fn closing_prices<'a>(
        &'a self,
        entries: Vec<SyncEntry>,
    ) -> Pin<Box<dyn Future<Output = Result<String, FeedError>> + Send + 'a>> {
        Box::pin(async move {
            let a = entries
                .iter()
                .map(SyncEntry::as_triple)
                .collect::<Vec<_>>()
                .join(";");
            self.call("ClosingPrices", Some(&a), None).await
        })
    }
}

fn parse_instrument_rows(body: &str) -> Result<Vec<Instrument>, FeedError> {
    body.split(';')
        .filter(|row| !row.is_empty())
        .map(|row| Instrument::parse_row(row).map_err(FeedError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpError, HttpResponse};
    use std::sync::Mutex;

    /// Transport stub recording requested URLs and answering from a script.
    struct ScriptedHttp {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedHttp {
        fn answering(body: &str) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(vec![Ok(HttpResponse::ok(body))]),
                urls: Mutex::new(Vec::new()),
            })
        }

        fn requested_urls(&self) -> Vec<String> {
            self.urls.lock().expect("lock").clone()
        }
    }

    impl HttpClient for ScriptedHttp {
        fn get<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            Box::pin(async move {
                self.urls.lock().expect("lock").push(request.url);
                self.responses
                    .lock()
                    .expect("lock")
                    .pop()
                    .unwrap_or_else(|| Ok(HttpResponse::ok("")))
            })
        }

        fn is_mock(&self) -> bool {
            true
        }
    }

    const INSTRUMENT_ROW: &str =
        "44891482026867833,IRO1FOLD0001,FOLD,ISIN,A,فولاد,Mobarakeh Steel,D,20230101,1,1,N1,1,NO,300,1,1,68";

    #[tokio::test]
    async fn instruments_reply_decodes_busy_and_current() {
        let http = ScriptedHttp::answering("*");
        let feed = TsetmcFeed::new(http.clone()).with_base_url("http://feed.test/api");
        let reply = feed.instruments(DEven::ZERO).await.expect("reply");
        assert_eq!(reply, InstrumentsReply::Busy);

        let http = ScriptedHttp::answering("");
        let feed = TsetmcFeed::new(http).with_base_url("http://feed.test/api");
        let reply = feed.instruments(DEven::ZERO).await.expect("reply");
        assert_eq!(reply, InstrumentsReply::Current);
    }

    #[tokio::test]
    async fn instruments_reply_parses_rows() {
        let http = ScriptedHttp::answering(INSTRUMENT_ROW);
        let feed = TsetmcFeed::new(http.clone()).with_base_url("http://feed.test/api");
        let reply = feed.instruments(DEven::ZERO).await.expect("reply");
        match reply {
            InstrumentsReply::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].symbol, "فولاد");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
        let urls = http.requested_urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("t=Instrument"));
        assert!(urls[0].contains("a=0"));
    }

    #[tokio::test]
    async fn shares_reply_splits_on_at() {
        let body = format!("{INSTRUMENT_ROW}@7,44891482026867833,20230301,1000,2000");
        let http = ScriptedHttp::answering(&body);
        let feed = TsetmcFeed::new(http).with_base_url("http://feed.test/api");
        let reply = feed
            .instruments_and_shares(DEven::ZERO, 0)
            .await
            .expect("reply");
        match reply {
            InstrumentSharesReply::Data {
                instruments,
                shares,
            } => {
                assert_eq!(instruments.len(), 1);
                assert_eq!(shares.len(), 1);
                assert_eq!(shares[0].old_shares, 1000);
                assert_eq!(shares[0].new_shares, 2000);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn closing_prices_joins_entries_with_semicolons() {
        let http = ScriptedHttp::answering("");
        let feed = TsetmcFeed::new(http.clone()).with_base_url("http://feed.test/api");
        let entries = vec![
            SyncEntry {
                ins_code: InsCode(1),
                last_deven: DEven::ZERO,
                flag: 0,
            },
            SyncEntry {
                ins_code: InsCode(2),
                last_deven: DEven::parse("20230101").expect("valid"),
                flag: 1,
            },
        ];
        feed.closing_prices(entries).await.expect("reply");

        let urls = http.requested_urls();
        assert_eq!(urls.len(), 1);
        let expected = urlencoding::encode("1,0,0;2,20230101,1").into_owned();
        assert!(urls[0].contains(&expected), "url={}", urls[0]);
    }

    #[tokio::test]
    async fn non_success_status_is_a_protocol_error() {
        let http = Arc::new(ScriptedHttp {
            responses: Mutex::new(vec![Ok(HttpResponse {
                status: 503,
                body: String::new(),
            })]),
            urls: Mutex::new(Vec::new()),
        });
        let feed = TsetmcFeed::new(http).with_base_url("http://feed.test/api");
        let err = feed.last_possible_deven().await.expect_err("must fail");
        assert!(matches!(err, FeedError::Protocol(_)));
    }
}
