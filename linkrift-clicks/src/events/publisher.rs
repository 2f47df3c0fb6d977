use uuid::Uuid;

use linkrift_shared::clients::rabbitmq::RabbitMQClient;
use linkrift_shared::types::{event_names, payloads, Event};

use crate::models::NewClick;

/// Publish a `link.clicked` webhook event onto the topic. Publish failures
/// log and drop; webhook delivery is best-effort from the processor's view.
pub async fn publish_link_clicked(
    rabbitmq: &RabbitMQClient,
    workspace_id: Uuid,
    destination_url: &str,
    record: &NewClick,
) {
    let event = Event::new(
        "linkrift-clicks",
        event_names::LINK_CLICKED,
        workspace_id,
        payloads::LinkClicked {
            link_id: record.link_id,
            short_code: record.short_code.clone(),
            destination_url: destination_url.to_string(),
            country_code: record.country_code.clone(),
            device_type: record.device_type.clone(),
            browser_name: record.browser_name.clone(),
            os_name: record.os_name.clone(),
            referer: record.referer.clone(),
            clicked_at: record.clicked_at,
        },
    );

    if let Err(e) = rabbitmq.publish(event_names::LINK_CLICKED, &event).await {
        tracing::error!(error = %e, "failed to publish link.clicked event");
    }
}
