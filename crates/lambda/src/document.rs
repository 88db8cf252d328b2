//! Application summaries: rendered to HTML with `tera`, stored in S3 and
//! handed back to the user as a presigned link.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::info;

use lendbot_core::calculator::format_amount;
use lendbot_core::config::AppConfig;
use lendbot_core::domain::application::LoanApplication;
use lendbot_core::errors::StoreError;
use lendbot_core::ports::{ApplicationPublisher, DocumentStore};

const SUMMARY_TEMPLATE: &str = "summary.html";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("template error: {0}")]
    Template(String),
}

impl From<DocumentError> for StoreError {
    fn from(error: DocumentError) -> Self {
        StoreError::Backend(error.to_string())
    }
}

/// Register filters used by the application templates.
///
/// - `yes_no`: booleans as `Yes` / `No`
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("yes_no", yes_no_filter);
}

fn yes_no_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let flag = value.as_bool().ok_or_else(|| tera::Error::msg("yes_no expects a boolean"))?;
    Ok(tera::Value::String(if flag { "Yes" } else { "No" }.to_string()))
}

#[derive(Serialize)]
struct ApplicationView {
    id: String,
    user_name: String,
    loan_value: String,
    down_payment: String,
    financed_amount: String,
    monthly_income: String,
    housing_expense: String,
    debt_amount: String,
    debt_to_income_pct: Option<String>,
    credit_score: u16,
    work_history: bool,
    coborrower: bool,
    closing_date: String,
    submitted_at: String,
}

impl From<&LoanApplication> for ApplicationView {
    fn from(application: &LoanApplication) -> Self {
        Self {
            id: application.id.to_string(),
            user_name: application.user_name.clone(),
            loan_value: format_amount(application.loan_value),
            down_payment: format_amount(application.down_payment),
            financed_amount: format_amount(application.financed_amount()),
            monthly_income: format_amount(application.monthly_income),
            housing_expense: format_amount(application.housing_expense),
            debt_amount: format_amount(application.debt_amount),
            debt_to_income_pct: application.debt_to_income_pct().map(|pct| pct.to_string()),
            credit_score: application.credit_score,
            work_history: application.work_history,
            coborrower: application.coborrower,
            closing_date: application.closing_date.format("%B %-d, %Y").to_string(),
            submitted_at: application.submitted_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApplicationRenderer {
    tera: Tera,
}

impl ApplicationRenderer {
    pub fn new() -> Result<Self, DocumentError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_template(
            SUMMARY_TEMPLATE,
            include_str!("../../../templates/applications/summary.html.tera"),
        )
        .map_err(|e| DocumentError::Template(e.to_string()))?;
        Ok(Self { tera })
    }

    pub fn render(
        &self,
        application: &LoanApplication,
        company_name: &str,
    ) -> Result<String, DocumentError> {
        let mut context = Context::new();
        context.insert("application", &ApplicationView::from(application));
        context.insert("company_name", company_name);
        self.tera
            .render(SUMMARY_TEMPLATE, &context)
            .map_err(|e| DocumentError::Template(e.to_string()))
    }
}

pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in_secs: u64) -> Result<String, StoreError> {
        let presigning = PresigningConfig::expires_in(Duration::from_secs(expires_in_secs))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;
        Ok(request.uri().to_string())
    }
}

/// Renders, uploads and links a submitted application.
pub struct DocumentPublisher {
    store: Arc<dyn DocumentStore>,
    renderer: ApplicationRenderer,
    key_prefix: String,
    expires_in_secs: u64,
    company_name: String,
}

impl DocumentPublisher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        renderer: ApplicationRenderer,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            renderer,
            key_prefix: config.artifacts.key_prefix.trim_matches('/').to_string(),
            expires_in_secs: config.artifacts.presign_expiry_secs,
            company_name: config.assistant.company_name.clone(),
        }
    }

    pub fn object_key(&self, application: &LoanApplication) -> String {
        let file = format!("{}/{}.html", application.user_name, application.id);
        if self.key_prefix.is_empty() {
            file
        } else {
            format!("{}/{file}", self.key_prefix)
        }
    }
}

#[async_trait]
impl ApplicationPublisher for DocumentPublisher {
    async fn publish(&self, application: &LoanApplication) -> Result<String, StoreError> {
        let html = self.renderer.render(application, &self.company_name)?;
        let key = self.object_key(application);

        self.store.put_object(&key, html.into_bytes(), HTML_CONTENT_TYPE).await?;
        let link = self.store.presign_get(&key, self.expires_in_secs).await?;

        info!(
            event_name = "document.application.published",
            application_id = %application.id,
            object_key = %key,
            expires_in_secs = self.expires_in_secs,
            "application summary stored"
        );
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use lendbot_core::config::AppConfig;
    use lendbot_core::domain::application::{ApplicationId, LoanApplication};
    use lendbot_core::errors::StoreError;
    use lendbot_core::ports::{ApplicationPublisher, DocumentStore};

    use super::{ApplicationRenderer, DocumentPublisher};

    #[derive(Default)]
    struct RecordingStore {
        objects: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn put_object(
            &self,
            key: &str,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<(), StoreError> {
            let body = String::from_utf8(body).expect("utf-8 body");
            self.objects.lock().expect("objects lock").push((
                key.to_string(),
                body,
                content_type.to_string(),
            ));
            Ok(())
        }

        async fn presign_get(&self, key: &str, expires_in_secs: u64) -> Result<String, StoreError> {
            Ok(format!("https://docs.example/{key}?expires={expires_in_secs}"))
        }
    }

    fn application(user_name: &str) -> LoanApplication {
        LoanApplication {
            id: ApplicationId::generate(),
            user_name: user_name.to_string(),
            loan_value: Decimal::from(450_000),
            monthly_income: Decimal::from(10_000),
            work_history: true,
            credit_score: 735,
            housing_expense: Decimal::from(2_000),
            debt_amount: Decimal::from(500),
            down_payment: Decimal::from(90_000),
            coborrower: false,
            closing_date: NaiveDate::from_ymd_opt(2026, 12, 4).expect("date"),
            submitted_at: Utc.with_ymd_and_hms(2026, 10, 18, 14, 30, 0).single().expect("time"),
        }
    }

    #[test]
    fn summary_lists_the_collected_answers() {
        let renderer = ApplicationRenderer::new().expect("template loads");
        let html = renderer.render(&application("jdoe"), "Octank Financial").expect("render");

        assert!(html.contains("Octank Financial home loan application"));
        assert!(html.contains("$450,000"));
        assert!(html.contains("$360,000"));
        assert!(html.contains("December 4, 2026"));
        assert!(html.contains("<td>25.00%</td>") || html.contains("<td>25%</td>"));
        assert!(html.contains("<td>Yes</td>"));
    }

    #[test]
    fn user_supplied_text_is_escaped() {
        let renderer = ApplicationRenderer::new().expect("template loads");
        let html = renderer.render(&application("<b>x</b>"), "Octank").expect("render");
        assert!(!html.contains("<b>x</b>"));
    }

    #[tokio::test]
    async fn publish_stores_html_under_user_prefix_and_returns_link() {
        let store = Arc::new(RecordingStore::default());
        let publisher = DocumentPublisher::new(
            store.clone(),
            ApplicationRenderer::new().expect("template loads"),
            &AppConfig::default(),
        );
        let submitted = application("jdoe");

        let link = publisher.publish(&submitted).await.expect("publish");

        let expected_key = format!("applications/jdoe/{}.html", submitted.id);
        assert_eq!(link, format!("https://docs.example/{expected_key}?expires=600"));
        let objects = store.objects.lock().expect("objects lock");
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].0, expected_key);
        assert_eq!(objects[0].2, "text/html; charset=utf-8");
    }
}
