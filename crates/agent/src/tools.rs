use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use lendbot_core::calculator::{estimate_payment, format_amount, LoanTerms};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &str) -> Result<String>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the tools the assistant ships with.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(LoanPaymentTool);
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// One `> name: description` line per tool.
    pub fn describe(&self) -> String {
        self.tools
            .values()
            .map(|tool| format!("> {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub struct LoanPaymentTool;

#[async_trait]
impl Tool for LoanPaymentTool {
    fn name(&self) -> &'static str {
        "loan_payment_calculator"
    }

    fn description(&self) -> &'static str {
        "Calculates the fixed monthly payment of a loan. Input is three comma separated \
         numbers: principal, annual_rate, years (for example `300000, 6.5, 30`)."
    }

    async fn execute(&self, input: &str) -> Result<String> {
        let cleaned = input.trim().trim_matches(|c| c == '"' || c == '`');
        // Years and rate come last; anything before them is the principal,
        // which may carry thousands separators.
        let mut fields = cleaned.rsplitn(3, ',');
        let (Some(years), Some(rate), Some(principal)) =
            (fields.next(), fields.next(), fields.next())
        else {
            bail!("expected `principal, annual_rate, years`, got `{input}`");
        };
        let principal = number_text(principal).replace(',', "");
        let rate = number_text(rate);
        let years = number_text(years);

        let principal = Decimal::from_str(&principal)
            .with_context(|| format!("principal `{principal}` is not a number"))?;
        let annual_rate_pct = Decimal::from_str(&rate)
            .with_context(|| format!("annual rate `{rate}` is not a number"))?;
        let years =
            years.parse::<u32>().with_context(|| format!("years `{years}` is not a whole number"))?;

        let estimate = estimate_payment(&LoanTerms { principal, annual_rate_pct, years })?;
        Ok(format!(
            "Monthly payment ${} over {} years; total interest ${}.",
            format_amount(estimate.monthly_payment),
            estimate.years,
            format_amount(estimate.total_interest),
        ))
    }
}

fn number_text(field: &str) -> String {
    field.trim().trim_start_matches('$').replace(['%', '_', ' '], "")
}
