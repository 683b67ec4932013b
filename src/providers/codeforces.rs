use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use ring::digest::{digest, SHA512};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    models::{ActivityEvent, CardError, NormalizedProfile, Platform, RatingChange, Result},
    providers::{
        client::{ApiCredentials, ProfileProvider, ProviderConfig},
        resilience::{retry_with_backoff, RetryConfig},
    },
};

const PLATFORM: &str = "codeforces";

/// Codeforces REST API client. Requests are signed when credentials are
/// configured, which lifts the anonymous rate limit.
pub struct CodeforcesClient {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
    submission_limit: u32,
    retry: RetryConfig,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    status: String,
    comment: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    handle: String,
    rating: Option<i64>,
    max_rating: Option<i64>,
    rank: Option<String>,
    max_rank: Option<String>,
    contribution: Option<i64>,
    friend_of_count: Option<u64>,
    title_photo: Option<String>,
    avatar: Option<String>,
    city: Option<String>,
    country: Option<String>,
    organization: Option<String>,
    last_online_time_seconds: Option<i64>,
    registration_time_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingUpdate {
    contest_name: String,
    rank: Option<u64>,
    rating_update_time_seconds: i64,
    new_rating: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Submission {
    creation_time_seconds: i64,
    problem: Problem,
    verdict: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Problem {
    contest_id: Option<i64>,
    problemset_name: Option<String>,
    index: String,
    name: String,
}

impl CodeforcesClient {
    pub fn new(config: ProviderConfig, retry: RetryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("cp-cards/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials,
            submission_limit: config.submission_limit,
            retry,
        })
    }

    /// Call an API method, retrying transient failures.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<(String, String)>,
    ) -> Result<T> {
        retry_with_backoff(&self.retry, method, || self.call_once(method, params.clone())).await
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<T> {
        if let Some(credentials) = &self.credentials {
            params = signed_params(
                method,
                params,
                credentials,
                chrono::Utc::now().timestamp(),
                &random_prefix(),
            );
        }

        let url = format!("{}/{}", self.base_url, method);
        debug!("GET {} ({} params)", url, params.len());

        let response = self.http_client.get(&url).query(&params).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        parse_response(status, &body, &params)
    }

    async fn user_info(&self, handle: &str) -> Result<User> {
        let users: Vec<User> = self
            .call("user.info", vec![("handles".to_string(), handle.to_string())])
            .await?;

        users.into_iter().next().ok_or_else(|| CardError::HandleNotFound {
            platform: PLATFORM.to_string(),
            handle: handle.to_string(),
        })
    }

    async fn user_rating(&self, handle: &str) -> Result<Vec<RatingUpdate>> {
        self.call("user.rating", vec![("handle".to_string(), handle.to_string())])
            .await
    }

    async fn user_status(&self, handle: &str) -> Result<Vec<Submission>> {
        self.call(
            "user.status",
            vec![
                ("handle".to_string(), handle.to_string()),
                ("from".to_string(), "1".to_string()),
                ("count".to_string(), self.submission_limit.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl ProfileProvider for CodeforcesClient {
    fn platform(&self) -> Platform {
        Platform::Codeforces
    }

    async fn fetch_profile(&self, handle: &str) -> Result<NormalizedProfile> {
        info!("Fetching Codeforces profile for {}", handle);

        let (user, ratings, submissions) = futures::try_join!(
            self.user_info(handle),
            self.user_rating(handle),
            self.user_status(handle),
        )?;

        info!(
            "Fetched {}: {} rating changes, {} submissions",
            user.handle,
            ratings.len(),
            submissions.len()
        );

        Ok(normalize(user, ratings, submissions))
    }
}

/// Classify a raw API response. A body that is not a JSON envelope is only
/// an upstream fault when the status says so; on a 2xx it is unreadable and
/// never retried.
fn parse_response<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
    params: &[(String, String)],
) -> Result<T> {
    if status == 429 {
        return Err(CardError::RateLimited { platform: PLATFORM.to_string() });
    }

    match serde_json::from_slice::<ApiResponse<T>>(body) {
        Ok(envelope) => unwrap_envelope(envelope, status, params),
        Err(_) if status == 404 => Err(handle_not_found(params)),
        Err(_) if !(200..300).contains(&status) => Err(CardError::UpstreamStatus {
            platform: PLATFORM.to_string(),
            status,
        }),
        Err(e) => Err(CardError::payload(PLATFORM, format!("Failed to parse response: {}", e))),
    }
}

fn unwrap_envelope<T>(body: ApiResponse<T>, status: u16, params: &[(String, String)]) -> Result<T> {
    if body.status == "OK" {
        return body
            .result
            .ok_or_else(|| CardError::payload(PLATFORM, "Empty result"));
    }

    let comment = body.comment.unwrap_or_default();
    let lowered = comment.to_lowercase();

    if lowered.contains("not found") || status == 404 {
        return Err(handle_not_found(params));
    }
    if lowered.contains("limit exceeded") {
        return Err(CardError::RateLimited { platform: PLATFORM.to_string() });
    }
    if (400..500).contains(&status) {
        return Err(CardError::UpstreamStatus {
            platform: PLATFORM.to_string(),
            status,
        });
    }

    Err(CardError::upstream(PLATFORM, comment))
}

fn handle_not_found(params: &[(String, String)]) -> CardError {
    let handle = params
        .iter()
        .find(|(k, _)| k == "handle" || k == "handles")
        .map(|(_, v)| v.clone())
        .unwrap_or_default();
    CardError::HandleNotFound {
        platform: PLATFORM.to_string(),
        handle,
    }
}

fn random_prefix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

/// Adds `apiKey`, `time` and `apiSig` to `params`.
///
/// The signature is `prefix + hex(sha512("{prefix}/{method}?{sorted query}#{secret}"))`
/// with parameters sorted by name, then value.
pub fn signed_params(
    method: &str,
    mut params: Vec<(String, String)>,
    credentials: &ApiCredentials,
    time: i64,
    prefix: &str,
) -> Vec<(String, String)> {
    params.push(("apiKey".to_string(), credentials.key.clone()));
    params.push(("time".to_string(), time.to_string()));
    params.sort();

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let payload = format!("{}/{}?{}#{}", prefix, method, query, credentials.secret);
    let hash = digest(&SHA512, payload.as_bytes());

    params.push(("apiSig".to_string(), format!("{}{}", prefix, hex::encode(hash.as_ref()))));
    params
}

fn problem_key(problem: &Problem) -> String {
    match (problem.contest_id, problem.problemset_name.as_deref()) {
        (Some(contest), _) => format!("{}{}", contest, problem.index),
        (None, Some(set)) => format!("{}/{}", set, problem.index),
        (None, None) => problem.name.clone(),
    }
}

fn normalize(
    user: User,
    ratings: Vec<RatingUpdate>,
    submissions: Vec<Submission>,
) -> NormalizedProfile {
    let rating_history = ratings
        .into_iter()
        .map(|r| RatingChange {
            timestamp_seconds: r.rating_update_time_seconds,
            new_rating: r.new_rating,
            contest_name: r.contest_name,
            contest_rank: r.rank,
        })
        .collect();

    let activity_events = submissions
        .iter()
        .filter(|s| s.verdict.as_deref() == Some("OK"))
        .map(|s| ActivityEvent {
            timestamp_seconds: s.creation_time_seconds,
            problem_key: problem_key(&s.problem),
        })
        .collect();

    let avatar_ref = user.title_photo.or(user.avatar).map(|url| {
        if url.starts_with("//") {
            format!("https:{}", url)
        } else {
            url
        }
    });

    NormalizedProfile {
        handle: user.handle,
        current_rating: user.rating,
        max_rating: user.max_rating,
        rank_label: user.rank.unwrap_or_default(),
        max_rank_label: user.max_rank.unwrap_or_default(),
        rating_history,
        activity_events,
        avatar_ref,
        location: user.city,
        organization: user.organization.filter(|o| !o.is_empty()),
        country: user.country,
        contribution: user.contribution,
        friend_count: user.friend_of_count,
        global_rank: None,
        country_rank: None,
        last_online_seconds: user.last_online_time_seconds,
        registered_seconds: user.registration_time_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_INFO: &str = r#"{
        "status": "OK",
        "result": [{
            "handle": "tourist", "rating": 3757, "maxRating": 4229,
            "rank": "legendary grandmaster", "maxRank": "tourist",
            "contribution": 119, "friendOfCount": 70000,
            "titlePhoto": "//userpic.codeforces.org/422/title/50a270ed4a722867.jpg",
            "country": "Belarus", "city": "Gomel", "organization": "ITMO University",
            "lastOnlineTimeSeconds": 1717000000, "registrationTimeSeconds": 1265987288
        }]
    }"#;

    const USER_RATING: &str = r#"{
        "status": "OK",
        "result": [
            {"contestId": 2, "contestName": "Codeforces Beta Round #2", "handle": "tourist",
             "rank": 14, "ratingUpdateTimeSeconds": 1267124400, "oldRating": 0, "newRating": 1602},
            {"contestId": 8, "contestName": "Codeforces Beta Round #8", "handle": "tourist",
             "rank": 5, "ratingUpdateTimeSeconds": 1270748700, "oldRating": 1602, "newRating": 1764}
        ]
    }"#;

    const USER_STATUS: &str = r#"{
        "status": "OK",
        "result": [
            {"id": 3, "contestId": 1, "creationTimeSeconds": 1700000300,
             "problem": {"contestId": 1, "index": "A", "name": "Theatre Square"},
             "verdict": "OK"},
            {"id": 2, "contestId": 1, "creationTimeSeconds": 1700000200,
             "problem": {"contestId": 1, "index": "A", "name": "Theatre Square"},
             "verdict": "WRONG_ANSWER"},
            {"id": 1, "creationTimeSeconds": 1700000100,
             "problem": {"problemsetName": "acmsguru", "index": "100", "name": "A+B"},
             "verdict": "OK"},
            {"id": 0, "contestId": 4, "creationTimeSeconds": 1700000000,
             "problem": {"contestId": 4, "index": "B", "name": "Before an Exam"}}
        ]
    }"#;

    fn parse<T: DeserializeOwned>(json: &str) -> T {
        let body: ApiResponse<T> = serde_json::from_str(json).unwrap();
        unwrap_envelope(body, 200, &[]).unwrap()
    }

    #[test]
    fn test_normalize_profile() {
        let user: Vec<User> = parse(USER_INFO);
        let ratings: Vec<RatingUpdate> = parse(USER_RATING);
        let submissions: Vec<Submission> = parse(USER_STATUS);

        let profile = normalize(user.into_iter().next().unwrap(), ratings, submissions);

        assert_eq!(profile.handle, "tourist");
        assert_eq!(profile.current_rating, Some(3757));
        assert_eq!(profile.rank_label, "legendary grandmaster");
        assert_eq!(profile.rating_history.len(), 2);
        assert_eq!(profile.rating_history[1].contest_rank, Some(5));
        assert_eq!(
            profile.avatar_ref.as_deref(),
            Some("https://userpic.codeforces.org/422/title/50a270ed4a722867.jpg")
        );
        assert_eq!(profile.location.as_deref(), Some("Gomel"));
        assert_eq!(profile.friend_count, Some(70000));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_only_accepted_submissions_become_events() {
        let submissions: Vec<Submission> = parse(USER_STATUS);
        let user = User {
            handle: "x".to_string(),
            rating: None,
            max_rating: None,
            rank: None,
            max_rank: None,
            contribution: None,
            friend_of_count: None,
            title_photo: None,
            avatar: None,
            city: None,
            country: None,
            organization: None,
            last_online_time_seconds: None,
            registration_time_seconds: None,
        };

        let profile = normalize(user, vec![], submissions);
        let keys: Vec<_> = profile.activity_events.iter().map(|e| e.problem_key.as_str()).collect();
        assert_eq!(keys, vec!["1A", "acmsguru/100"]);
        assert_eq!(profile.rating(), None);
    }

    #[test]
    fn test_failed_envelope_classification() {
        let body: ApiResponse<Vec<User>> = serde_json::from_str(
            r#"{"status":"FAILED","comment":"handles: User with handle ghost_user not found"}"#,
        )
        .unwrap();
        let params = vec![("handles".to_string(), "ghost_user".to_string())];
        match unwrap_envelope(body, 400, &params) {
            Err(CardError::HandleNotFound { handle, .. }) => assert_eq!(handle, "ghost_user"),
            other => panic!("Expected HandleNotFound, got {:?}", other.err()),
        }

        let body: ApiResponse<Vec<User>> =
            serde_json::from_str(r#"{"status":"FAILED","comment":"Call limit exceeded"}"#).unwrap();
        assert!(matches!(
            unwrap_envelope(body, 503, &[]),
            Err(CardError::RateLimited { .. })
        ));

        let body: ApiResponse<Vec<User>> = serde_json::from_str(
            r#"{"status":"FAILED","comment":"apiKey: Incorrect API key"}"#,
        )
        .unwrap();
        let err = unwrap_envelope(body, 400, &[]).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unreadable_body_classification() {
        let params = vec![("handle".to_string(), "tourist".to_string())];

        let garbled = parse_response::<Vec<User>>(200, b"<html>maintenance</html>", &params);
        match garbled {
            Err(err @ CardError::UpstreamPayload { .. }) => assert!(!err.is_retryable()),
            other => panic!("Expected UpstreamPayload, got {:?}", other.err()),
        }

        let empty = parse_response::<Vec<User>>(200, br#"{"status":"OK"}"#, &params);
        assert!(matches!(empty, Err(CardError::UpstreamPayload { .. })));

        let missing = parse_response::<Vec<User>>(404, b"Not Found", &params);
        assert!(matches!(missing, Err(CardError::HandleNotFound { .. })));

        let outage = parse_response::<Vec<User>>(502, b"Bad Gateway", &params).unwrap_err();
        assert!(matches!(outage, CardError::UpstreamStatus { status: 502, .. }));
        assert!(outage.is_retryable());

        let limited = parse_response::<Vec<User>>(429, b"", &params);
        assert!(matches!(limited, Err(CardError::RateLimited { .. })));
    }

    #[test]
    fn test_parse_response_reads_ok_envelope() {
        let ratings: Vec<RatingUpdate> = parse_response(200, USER_RATING.as_bytes(), &[]).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].new_rating, 1602);
    }

    #[test]
    fn test_signed_params() {
        let credentials = ApiCredentials {
            key: "xxx".to_string(),
            secret: "yyy".to_string(),
        };
        let params = signed_params(
            "contest.hacks",
            vec![("contestId".to_string(), "566".to_string())],
            &credentials,
            1_700_000_000,
            "123456",
        );

        let names: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["apiKey", "contestId", "time", "apiSig"]);

        let expected_payload = "123456/contest.hacks?apiKey=xxx&contestId=566&time=1700000000#yyy";
        let expected = format!(
            "123456{}",
            hex::encode(digest(&SHA512, expected_payload.as_bytes()).as_ref())
        );
        assert_eq!(params[3].1, expected);
        assert_eq!(params[3].1.len(), 6 + 128);
    }

    #[test]
    fn test_random_prefix_shape() {
        let prefix = random_prefix();
        assert_eq!(prefix.len(), 6);
        assert!(prefix.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
