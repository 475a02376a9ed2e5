use std::time::Duration;

use async_trait::async_trait;
use rideshare_core::{CoreError, CoreResult, NotificationService};
use rideshare_shared::Masked;
use serde::Deserialize;
use tracing::{error, info};

use crate::app_config::TwilioConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CALL_TWIML: &str = "<Response><Say>Your call is being connected securely.</Say></Response>";

/// SMS and masked-call delivery through the Twilio REST API.
pub struct TwilioNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
}

#[derive(Debug, Deserialize)]
struct TwilioResource {
    sid: String,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/Accounts/{}/{}.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid,
            resource
        )
    }

    async fn post(&self, resource: &str, form: &[(&str, &str)]) -> CoreResult<String> {
        let response = self
            .client
            .post(self.endpoint(resource))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| CoreError::DependencyError(format!("twilio request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Twilio {} rejected with {}: {}", resource, status, body);
            return Err(CoreError::DependencyError(format!("twilio returned {}", status)));
        }

        let created: TwilioResource = response
            .json()
            .await
            .map_err(|e| CoreError::DependencyError(format!("unreadable twilio response: {}", e)))?;
        Ok(created.sid)
    }
}

#[async_trait]
impl NotificationService for TwilioNotifier {
    async fn send_sms(&self, to: &Masked<String>, body: &str) -> CoreResult<String> {
        let sid = self
            .post(
                "Messages",
                &[("To", to.expose().as_str()), ("From", self.config.from_number.as_str()), ("Body", body)],
            )
            .await?;
        info!(to = %to, sid = %sid, "SMS queued");
        Ok(sid)
    }

    async fn place_call(&self, to: &Masked<String>) -> CoreResult<String> {
        let sid = self
            .post(
                "Calls",
                &[("To", to.expose().as_str()), ("From", self.config.from_number.as_str()), ("Twiml", CALL_TWIML)],
            )
            .await?;
        info!(to = %to, sid = %sid, "Masked call started");
        Ok(sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_layout() {
        let notifier = TwilioNotifier::new(TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            from_number: "+15550000000".into(),
            base_url: "https://api.twilio.com/2010-04-01/".into(),
        })
        .unwrap();

        assert_eq!(
            notifier.endpoint("Messages"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
