use anyhow::{Context, bail};
use dnevnik::{ClientConfig, JournalClient, JournalEnv, JournalError, LoadFromEnv, client};
use dotenv::dotenv;
use log::{LevelFilter, info, warn};

async fn connect(env: &JournalEnv, config: &ClientConfig) -> anyhow::Result<JournalClient> {
    if let Some(token) = &env.token {
        info!("restoring session from token");
        return JournalClient::from_token(config, token)
            .await
            .context("couldn't open the journal with the saved token");
    }
    let (Some(email), Some(password)) = (&env.email, &env.password) else {
        bail!("set DNEVNIK_TOKEN or both DNEVNIK_EMAIL and DNEVNIK_PASSWORD");
    };
    match JournalClient::login(config, email, password).await {
        Err(JournalError::InvalidCredentials { status }) => {
            bail!("login refused ({status}), check the email and password")
        }
        other => other.context("couldn't log in to the journal"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let env = JournalEnv::load_from_env()?;
    let config = ClientConfig::from_env(&env)?;
    let journal = connect(&env, &config).await?;

    if let Some(cookies) = journal.session_cookies() {
        info!("session cookies: {cookies}");
    }

    for range in journal.period_dict().iter() {
        println!("{}: {} - {}", range.name, range.date_from, range.date_to);
    }
    let mut subjects: Vec<_> = journal.subject_dict().into_iter().collect();
    subjects.sort();
    for (name, id) in subjects {
        println!("{id}\t{name}");
    }

    let current = match journal.current_period() {
        Ok(current) => current,
        Err(err) => {
            warn!("{err}");
            return Ok(());
        }
    };
    let Some((from, to)) = journal.period_for_name(&current)? else {
        return Ok(());
    };
    info!("fetching marks for {current}");
    let marks = journal
        .fetch_marks_for_period(from, to, client::DEFAULT_MARKS_LIMIT, client::DEFAULT_PAGE)
        .await?;
    println!("{}", serde_json::to_string_pretty(&marks)?);
    Ok(())
}
