use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use farewatch_api::{app, state::AppState, state::AuthConfig, worker::start_alert_dispatcher};
use farewatch_engine::fanout::start_fanout_scheduler;
use farewatch_engine::pagination::PaginationEngine;
use farewatch_engine::processor::AlertProcessor;
use farewatch_store::alert_repo::PgAlertRepository;
use farewatch_store::mailer::SmtpMailer;
use farewatch_store::notification_repo::PgNotificationRepository;
use farewatch_store::provider_client::{AwardApiClient, FlightApiClient};
use farewatch_store::run_repo::PgRunRegistry;
use farewatch_store::search_request_repo::PgSearchRequestRepository;
use farewatch_store::trip_repo::PgTripStore;
use farewatch_store::user_repo::PgUserDirectory;
use farewatch_store::{DbClient, EventProducer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "farewatch_api=debug,farewatch_engine=debug,farewatch_store=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = farewatch_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Farewatch on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let producer = EventProducer::new(&config.kafka.brokers, &config.kafka.alert_topic)
        .expect("Failed to create Kafka producer");

    let alerts = Arc::new(PgAlertRepository::new(db.pool.clone()));
    let notifications = Arc::new(PgNotificationRepository::new(db.pool.clone()));
    let requests = Arc::new(PgSearchRequestRepository::new(db.pool.clone()));
    let trips = Arc::new(PgTripStore::new(db.pool.clone()));
    let users = Arc::new(PgUserDirectory::new(db.pool.clone()));
    let runs = Arc::new(PgRunRegistry::new(db.pool.clone()));
    let queue = Arc::new(producer);

    let award_client =
        Arc::new(AwardApiClient::new(&config.provider).expect("Failed to build award client"));
    let flight_client =
        Arc::new(FlightApiClient::new(&config.provider).expect("Failed to build flight client"));
    let mailer = Arc::new(SmtpMailer::new(&config.email).expect("Failed to build SMTP mailer"));

    let processor = Arc::new(AlertProcessor::new(
        alerts.clone(),
        notifications.clone(),
        users.clone(),
        flight_client,
        mailer,
    ));
    let pagination = Arc::new(PaginationEngine::new(
        requests.clone(),
        award_client,
        trips,
    ));

    start_fanout_scheduler(
        alerts.clone(),
        queue.clone(),
        Duration::from_secs(config.scheduler.fanout_interval_hours * 3600),
    );

    tokio::spawn(start_alert_dispatcher(
        config.kafka.brokers.clone(),
        config.kafka.consumer_group.clone(),
        config.kafka.alert_topic.clone(),
        processor,
        runs,
    ));

    let state = AppState {
        alerts,
        requests,
        queue,
        pagination,
        auth: AuthConfig {
            admin_token: config.auth.admin_token.clone(),
            manual_triggers_enabled: config.scheduler.manual_triggers_enabled,
        },
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app(state)).await.unwrap();
}
