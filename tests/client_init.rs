use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use dnevnik::{
    HttpReply, JournalClient, JournalError, Result, Transport, date_to_str, requests, routes,
};
use pretty_assertions::assert_eq;
use reqwest::{
    StatusCode,
    header::{HeaderMap, REFERER},
};
use serde_json::{Value, json};
use url::Url;

#[derive(Debug, Clone)]
struct Recorded {
    method: &'static str,
    url: Url,
    referer: Option<String>,
    query: Vec<(String, String)>,
}

/// Answers by URL path and remembers every request it saw.
#[derive(Default)]
struct FakeJournal {
    replies: HashMap<String, (u16, Value)>,
    seen: Mutex<Vec<Recorded>>,
}

impl FakeJournal {
    fn reply(mut self, path: &str, status: u16, body: Value) -> Self {
        self.replies.insert(path.to_string(), (status, body));
        self
    }

    fn answer(
        &self,
        method: &'static str,
        url: Url,
        headers: &HeaderMap,
        query: &[(&str, String)],
    ) -> Result<HttpReply> {
        let referer = headers
            .get(REFERER)
            .map(|value| value.to_str().unwrap().to_string());
        self.seen.lock().unwrap().push(Recorded {
            method,
            url: url.clone(),
            referer,
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        });
        match self.replies.get(url.path()) {
            Some((status, body)) => Ok(HttpReply {
                status: StatusCode::from_u16(*status).unwrap(),
                body: body.to_string(),
            }),
            None => Err(JournalError::Transport(format!("connection refused: {url}"))),
        }
    }

    fn seen(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeJournal {
    async fn get(
        &self,
        url: Url,
        headers: HeaderMap,
        query: &requests::Query,
    ) -> Result<HttpReply> {
        self.answer("GET", url, &headers, query)
    }

    async fn post_json(&self, url: Url, headers: HeaderMap, _body: &Value) -> Result<HttpReply> {
        self.answer("POST", url, &headers, &[])
    }
}

fn base() -> Url {
    Url::parse("https://journal.example.org/").unwrap()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn children() -> Value {
    json!({"data": {"items": [{
        "firstname": "Ivan",
        "educations": [{"jurisdiction_id": 1, "institution_id": 2, "education_id": 99}]
    }]}})
}

fn periods() -> Value {
    let start = today().checked_sub_days(Days::new(10)).unwrap();
    let end = today().checked_add_days(Days::new(10)).unwrap();
    json!({"data": {"items": [
        {
            "name": "Year",
            "date_from": date_to_str(start.checked_sub_days(Days::new(100)).unwrap()),
            "date_to": date_to_str(end.checked_add_days(Days::new(100)).unwrap()),
            "education_period": {"code": "30"},
            "identity": {"id": 500},
        },
        {
            "name": "Q1",
            "date_from": date_to_str(start),
            "date_to": date_to_str(end),
            "education_period": {"code": "10"},
            "identity": {"id": 501},
        },
    ]}})
}

fn healthy_journal() -> FakeJournal {
    FakeJournal::default()
        .reply(routes::CHILDREN_LIST, 200, children())
        .reply(routes::GROUP_LIST, 200, json!({"data": {"items": [{"id": 7}]}}))
        .reply(routes::PERIOD_LIST, 200, periods())
        .reply(
            routes::SUBJECT_LIST,
            200,
            json!({"data": {"items": [
                {"name": "Math", "id": 1},
                {"name": "Russian", "id": 3},
                {"name": "Math", "id": 2},
            ]}}),
        )
        .reply(routes::ESTIMATE_TABLE, 200, json!({"data": {"items": []}}))
}

fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[tokio::test]
async fn resolves_context_end_to_end() {
    let journal = JournalClient::new(healthy_journal(), base()).await.unwrap();

    assert_eq!(journal.jurisdiction(), 1);
    assert_eq!(journal.institution(), 2);
    assert_eq!(journal.education().education_id, 99);
    assert_eq!(journal.group(), 7);
    assert_eq!(journal.periods().len(), 2);

    let dict = journal.period_dict();
    assert_eq!(dict.names().collect::<Vec<_>>(), vec!["Q1"]);
    assert_eq!(journal.current_period().unwrap(), "Q1");

    let subjects = journal.subject_dict();
    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects["Math"], 2);
}

#[tokio::test]
async fn init_request_sequence() {
    let fake = healthy_journal();
    let journal = JournalClient::new(&fake, base()).await.unwrap();
    assert_eq!(journal.group(), 7);

    let seen = fake.seen();
    let paths: Vec<_> = seen.iter().map(|req| req.url.path().to_string()).collect();
    assert_eq!(
        paths,
        vec![
            routes::CHILDREN_LIST,
            routes::GROUP_LIST,
            routes::PERIOD_LIST,
            routes::SUBJECT_LIST,
        ]
    );
    assert!(seen.iter().all(|req| req.method == "GET"));
    assert_eq!(
        seen[0].referer.as_deref(),
        Some("https://journal.example.org/students/my")
    );
    for req in &seen[1..] {
        assert_eq!(
            req.referer.as_deref(),
            Some("https://journal.example.org/estimate")
        );
    }
    assert_eq!(
        seen[1].query,
        query(&[("p_page", "1"), ("p_jurisdictions[]", "1"), ("p_institutions[]", "2")])
    );
    assert_eq!(seen[2].query, query(&[("p_group_ids[]", "7"), ("p_page", "1")]));
    assert_eq!(
        seen[3].query,
        query(&[
            ("p_educations[]", "99"),
            ("p_groups[]", "7"),
            ("p_periods[]", "500"),
            ("p_limit", "100"),
            ("p_page", "1"),
        ])
    );
}

#[tokio::test]
async fn marks_query_has_no_referer() {
    let fake = healthy_journal();
    let journal = JournalClient::new(&fake, base()).await.unwrap();
    let from = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    journal
        .fetch_marks_for_period(from, "31.3.2024", 200, 1)
        .await
        .unwrap();

    let marks = fake.seen().pop().unwrap();
    assert_eq!(marks.url.path(), routes::ESTIMATE_TABLE);
    assert_eq!(marks.referer, None);
    assert_eq!(
        marks.query,
        query(&[
            ("p_educations[]", "99"),
            ("p_date_from", "5.3.2024"),
            ("p_date_to", "31.3.2024"),
            ("p_limit", "200"),
            ("p_page", "1"),
        ])
    );
}

#[tokio::test]
async fn direct_fetches_use_their_own_arguments() {
    let fake = healthy_journal();
    let journal = JournalClient::new(&fake, base()).await.unwrap();

    let children = journal.fetch_children_list().await.unwrap();
    assert_eq!(children.items()[0].educations[0].education_id, 99);
    let groups = journal.fetch_group_list(5, 6, 3).await.unwrap();
    assert_eq!(groups.items()[0].id, 7);
    let periods = journal.fetch_period_list(42, 2).await.unwrap();
    assert_eq!(periods.items().len(), 2);

    let seen = fake.seen();
    let direct = &seen[4..];
    assert_eq!(direct.len(), 3);

    assert_eq!(direct[0].url.path(), routes::CHILDREN_LIST);
    assert_eq!(
        direct[0].referer.as_deref(),
        Some("https://journal.example.org/students/my")
    );
    assert!(direct[0].query.is_empty());

    assert_eq!(direct[1].url.path(), routes::GROUP_LIST);
    assert_eq!(
        direct[1].referer.as_deref(),
        Some("https://journal.example.org/estimate")
    );
    assert_eq!(
        direct[1].query,
        query(&[("p_page", "3"), ("p_jurisdictions[]", "5"), ("p_institutions[]", "6")])
    );

    assert_eq!(direct[2].url.path(), routes::PERIOD_LIST);
    assert_eq!(
        direct[2].referer.as_deref(),
        Some("https://journal.example.org/estimate")
    );
    assert_eq!(direct[2].query, query(&[("p_group_ids[]", "42"), ("p_page", "2")]));

    // The resolved context is untouched by ad hoc fetches.
    assert_eq!(journal.group(), 7);
    assert_eq!(journal.jurisdiction(), 1);
}

#[tokio::test]
async fn subjects_default_to_first_period() {
    let fake = healthy_journal();
    let journal = JournalClient::new(&fake, base()).await.unwrap();

    journal.fetch_subjects(None, 100, 1).await.unwrap();
    journal.fetch_subjects(Some(0), 100, 1).await.unwrap();
    journal.fetch_subjects(Some(501), 50, 2).await.unwrap();

    let periods: Vec<_> = fake
        .seen()
        .iter()
        .skip(4)
        .map(|req| req.query[2].1.clone())
        .collect();
    assert_eq!(periods, vec!["500", "500", "501"]);
}

#[tokio::test]
async fn empty_children_list_aborts_construction() {
    let fake =
        healthy_journal().reply(routes::CHILDREN_LIST, 200, json!({"data": {"items": []}}));
    let err = JournalClient::new(&fake, base()).await.err().unwrap();
    assert!(matches!(err, JournalError::MalformedResponse(_)));
    assert_eq!(fake.seen().len(), 1);
}

#[tokio::test]
async fn child_without_educations_is_malformed() {
    let fake = healthy_journal().reply(
        routes::CHILDREN_LIST,
        200,
        json!({"data": {"items": [{"educations": []}]}}),
    );
    assert!(matches!(
        JournalClient::new(&fake, base()).await,
        Err(JournalError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let fake = healthy_journal().reply(routes::GROUP_LIST, 200, json!("<html>oops</html>"));
    assert!(matches!(
        JournalClient::new(&fake, base()).await,
        Err(JournalError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn expired_token_fails_at_first_fetch() {
    let fake =
        healthy_journal().reply(routes::CHILDREN_LIST, 401, json!({"message": "expired"}));
    assert!(matches!(
        JournalClient::new(&fake, base()).await,
        Err(JournalError::Transport(_))
    ));
}

#[tokio::test]
async fn failure_mid_sequence_stops_further_requests() {
    let fake = healthy_journal().reply(routes::PERIOD_LIST, 502, json!({}));
    assert!(matches!(
        JournalClient::new(&fake, base()).await,
        Err(JournalError::Transport(_))
    ));
    assert_eq!(fake.seen().len(), 3);
}

#[tokio::test]
async fn no_current_period_when_today_is_outside() {
    let fake = healthy_journal().reply(
        routes::PERIOD_LIST,
        200,
        json!({"data": {"items": [{
            "name": "Q1",
            "date_from": "1.9.2000",
            "date_to": "27.10.2000",
            "education_period": {"code": "10"},
            "identity": {"id": 1},
        }]}}),
    );
    let journal = JournalClient::new(&fake, base()).await.unwrap();
    assert!(matches!(
        journal.current_period(),
        Err(JournalError::NoCurrentPeriod { .. })
    ));
    assert_eq!(
        journal
            .current_period_on(NaiveDate::from_ymd_opt(2000, 10, 27).unwrap())
            .unwrap(),
        "Q1"
    );
}

#[tokio::test]
async fn login_maps_client_errors_to_invalid_credentials() {
    for status in [401, 403, 404] {
        let fake = FakeJournal::default().reply(routes::LOGIN, status, json!({}));
        let err = requests::login(&fake, &base(), "parent@example.org", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, JournalError::InvalidCredentials { .. }));
    }

    let fake = FakeJournal::default().reply(routes::LOGIN, 500, json!({}));
    let err = requests::login(&fake, &base(), "parent@example.org", "right")
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Transport(_)));
}

#[tokio::test]
async fn login_posts_with_login_referer() {
    let fake = FakeJournal::default().reply(routes::LOGIN, 200, json!({"data": {}}));
    requests::login(&fake, &base(), "parent@example.org", "right")
        .await
        .unwrap();
    let seen = fake.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].referer.as_deref(), Some("https://journal.example.org/login"));
}
