use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use log::info;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    config::ClientConfig,
    dates::DateBound,
    error::{JournalError, Result},
    models::{ChildrenList, Education, GroupList, Period, PeriodList, Subject, SubjectList},
    requests::{Query, Session, Transport},
    routes,
    views::{self, PeriodDict},
};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_SUBJECT_LIMIT: u32 = 100;
pub const DEFAULT_MARKS_LIMIT: u32 = 200;

/// An authenticated journal client plus the enrollment context resolved
/// when it was built: education, group, periods and subjects.
///
/// The context is fetched once and never refreshed. A client is meant to be
/// driven from one task at a time.
pub struct JournalClient<T: Transport = Session> {
    transport: T,
    base_url: Url,
    education: Education,
    group: i64,
    periods: Vec<Period>,
    subjects: Vec<Subject>,
}

impl JournalClient<Session> {
    pub async fn login(config: &ClientConfig, email: &str, password: &str) -> Result<Self> {
        let session = Session::login_with_credentials(config, email, password).await?;
        Self::new(session, config.base_url.clone()).await
    }

    pub async fn from_token(config: &ClientConfig, token: &str) -> Result<Self> {
        let session = Session::restore_from_token(config, token)?;
        Self::new(session, config.base_url.clone()).await
    }

    /// The cookie header carrying the authenticated identity.
    pub fn session_cookies(&self) -> Option<String> {
        self.transport.cookies_for(&self.base_url)
    }
}

impl<T: Transport> JournalClient<T> {
    /// Resolves the context in order: children, group, periods, subjects.
    /// Any failure aborts construction.
    pub async fn new(transport: T, base_url: Url) -> Result<Self> {
        let children: ChildrenList =
            fetch_json(&transport, &base_url, routes::CHILDREN_LIST, &[]).await?;
        let education = *children
            .first("children")?
            .educations
            .first()
            .ok_or_else(|| JournalError::malformed("first child has no educations"))?;
        info!(
            "education {} at institution {} (jurisdiction {})",
            education.education_id, education.institution_id, education.jurisdiction_id
        );

        let groups: GroupList = fetch_json(
            &transport,
            &base_url,
            routes::GROUP_LIST,
            &group_list_query(education.jurisdiction_id, education.institution_id, DEFAULT_PAGE),
        )
        .await?;
        let group = groups.first("group")?.id;
        info!("group {group}");

        let periods: PeriodList = fetch_json(
            &transport,
            &base_url,
            routes::PERIOD_LIST,
            &period_list_query(group, DEFAULT_PAGE),
        )
        .await?;
        let periods = periods.into_items();
        let default_period = periods
            .first()
            .ok_or_else(|| JournalError::malformed("period list is empty"))?
            .identity
            .id;
        info!("{} periods", periods.len());

        let subjects: SubjectList = fetch_json(
            &transport,
            &base_url,
            routes::SUBJECT_LIST,
            &subjects_query(
                education.education_id,
                group,
                default_period,
                DEFAULT_SUBJECT_LIMIT,
                DEFAULT_PAGE,
            ),
        )
        .await?;
        let subjects = subjects.into_items();
        info!("{} subjects", subjects.len());

        Ok(Self {
            transport,
            base_url,
            education,
            group,
            periods,
            subjects,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn education(&self) -> &Education {
        &self.education
    }

    pub fn jurisdiction(&self) -> i64 {
        self.education.jurisdiction_id
    }

    pub fn institution(&self) -> i64 {
        self.education.institution_id
    }

    pub fn group(&self) -> i64 {
        self.group
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub async fn fetch_children_list(&self) -> Result<ChildrenList> {
        self.fetch(routes::CHILDREN_LIST, &[]).await
    }

    pub async fn fetch_group_list(
        &self,
        jurisdiction: i64,
        institution: i64,
        page: u32,
    ) -> Result<GroupList> {
        self.fetch(
            routes::GROUP_LIST,
            &group_list_query(jurisdiction, institution, page),
        )
        .await
    }

    pub async fn fetch_period_list(&self, group: i64, page: u32) -> Result<PeriodList> {
        self.fetch(routes::PERIOD_LIST, &period_list_query(group, page))
            .await
    }

    /// `None` (or `0`) asks for the first period resolved at construction.
    pub async fn fetch_subjects(
        &self,
        period_id: Option<i64>,
        limit: u32,
        page: u32,
    ) -> Result<SubjectList> {
        let period_id = match period_id.filter(|id| *id != 0) {
            Some(id) => id,
            None => self.default_period_id()?,
        };
        self.fetch(
            routes::SUBJECT_LIST,
            &subjects_query(self.education.education_id, self.group, period_id, limit, page),
        )
        .await
    }

    /// The marks table between two dates. Its layout is passed through as is.
    pub async fn fetch_marks_for_period(
        &self,
        date_from: impl Into<DateBound>,
        date_to: impl Into<DateBound>,
        limit: u32,
        page: u32,
    ) -> Result<serde_json::Value> {
        let query = marks_query(
            self.education.education_id,
            &date_from.into(),
            &date_to.into(),
            limit,
            page,
        );
        self.fetch(routes::ESTIMATE_TABLE, &query).await
    }

    pub fn period_dict(&self) -> PeriodDict {
        views::period_dict(&self.periods)
    }

    pub fn current_period(&self) -> Result<String> {
        self.current_period_on(Local::now().date_naive())
    }

    pub fn current_period_on(&self, day: NaiveDate) -> Result<String> {
        views::current_period(&self.periods, day)
    }

    pub fn period_for_name(&self, name: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
        views::period_for_name(&self.periods, name)
    }

    pub fn subject_dict(&self) -> HashMap<String, i64> {
        views::subject_dict(&self.subjects)
    }

    fn default_period_id(&self) -> Result<i64> {
        self.periods
            .first()
            .map(|period| period.identity.id)
            .ok_or_else(|| JournalError::malformed("period list is empty"))
    }

    async fn fetch<R: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<R> {
        fetch_json(&self.transport, &self.base_url, path, query).await
    }
}

async fn fetch_json<T, R>(transport: &T, base_url: &Url, path: &str, query: &Query) -> Result<R>
where
    T: Transport + ?Sized,
    R: DeserializeOwned,
{
    let route = routes::resolve(path, base_url)?;
    let reply = transport
        .get(route.url.clone(), route.headers, query)
        .await?
        .error_for_status(&route.url)?;
    reply.json()
}

fn group_list_query(jurisdiction: i64, institution: i64, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("p_page", page.to_string()),
        ("p_jurisdictions[]", jurisdiction.to_string()),
        ("p_institutions[]", institution.to_string()),
    ]
}

fn period_list_query(group: i64, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("p_group_ids[]", group.to_string()),
        ("p_page", page.to_string()),
    ]
}

fn subjects_query(
    education: i64,
    group: i64,
    period: i64,
    limit: u32,
    page: u32,
) -> Vec<(&'static str, String)> {
    vec![
        ("p_educations[]", education.to_string()),
        ("p_groups[]", group.to_string()),
        ("p_periods[]", period.to_string()),
        ("p_limit", limit.to_string()),
        ("p_page", page.to_string()),
    ]
}

fn marks_query(
    education: i64,
    date_from: &DateBound,
    date_to: &DateBound,
    limit: u32,
    page: u32,
) -> Vec<(&'static str, String)> {
    vec![
        ("p_educations[]", education.to_string()),
        ("p_date_from", date_from.to_query_value()),
        ("p_date_to", date_to.to_query_value()),
        ("p_limit", limit.to_string()),
        ("p_page", page.to_string()),
    ]
}
