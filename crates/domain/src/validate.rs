//! Structural validation of the order aggregate.
//!
//! Each value object has an explicit `validate` that collects every violated
//! constraint instead of stopping at the first one, so a rejected message can
//! be logged with the full list of problems.

use crate::order::{Delivery, Item, Order, Payment};
use std::fmt;
use thiserror::Error;

const LOCALES: &[&str] = &["ru", "en", "fr", "de"];

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.rule, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order: {}", format_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates violations while walking the aggregate.
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    fn fail(&mut self, field: &str, rule: &'static str, message: impl Into<String>) {
        self.violations.push(Violation {
            field: field.to_string(),
            rule,
            message: message.into(),
        });
    }

    fn required(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.fail(field, "required", "must not be empty");
        }
    }

    fn alphanumeric(&mut self, field: &str, value: &str) {
        if !value.is_empty() && !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            self.fail(field, "alphanum", "must contain only letters and digits");
        }
    }

    fn numeric(&mut self, field: &str, value: &str) {
        if !value.chars().all(|c| c.is_ascii_digit()) || value.is_empty() {
            self.fail(field, "numeric", "must contain only digits");
        }
    }

    fn uppercase_alpha(&mut self, field: &str, value: &str) {
        if !value.chars().all(|c| c.is_ascii_uppercase()) || value.is_empty() {
            self.fail(field, "alpha_upper", "must contain only uppercase letters");
        }
    }

    fn positive_i64(&mut self, field: &str, value: i64) {
        if value <= 0 {
            self.fail(field, "gt_zero", format!("must be positive, got {value}"));
        }
    }

    fn positive_f64(&mut self, field: &str, value: f64) {
        if !(value > 0.0) {
            self.fail(field, "gt_zero", format!("must be positive, got {value}"));
        }
    }

    fn non_negative_f64(&mut self, field: &str, value: f64) {
        if !(value >= 0.0) {
            self.fail(field, "gte_zero", format!("must not be negative, got {value}"));
        }
    }

    fn length_between(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            self.fail(
                field,
                "length",
                format!("length must be between {min} and {max}, got {len}"),
            );
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                violations: self.violations,
            })
        }
    }
}

impl Order {
    /// Validate the whole aggregate, including nested value objects.
    ///
    /// Violations from nested objects carry prefixed field paths such as
    /// `delivery.phone` and `items[2].price`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Checker::new();

        c.required("order_uid", &self.order_uid);
        c.alphanumeric("order_uid", &self.order_uid);
        c.required("track_number", &self.track_number);
        c.uppercase_alpha("entry", &self.entry);
        if !LOCALES.contains(&self.locale.as_str()) {
            c.fail(
                "locale",
                "oneof",
                format!("must be one of {LOCALES:?}, got {:?}", self.locale),
            );
        }
        c.required("customer_id", &self.customer_id);
        c.required("delivery_service", &self.delivery_service);
        c.numeric("shardkey", &self.shardkey);
        c.positive_i64("sm_id", self.sm_id);
        c.required("date_created", &self.date_created);
        c.numeric("oof_shard", &self.oof_shard);

        self.delivery.check(&mut c);
        self.payment.check(&mut c);

        if self.items.is_empty() {
            c.fail("items", "min_items", "order must have at least one item");
        }
        for (i, item) in self.items.iter().enumerate() {
            item.check(&mut c, i);
        }

        c.finish()
    }
}

impl Delivery {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Checker::new();
        self.check(&mut c);
        c.finish()
    }

    fn check(&self, c: &mut Checker) {
        c.required("delivery.name", &self.name);
        if !looks_like_phone(&self.phone) {
            c.fail(
                "delivery.phone",
                "phone",
                "must be a plus sign followed by digits",
            );
        }
        c.required("delivery.zip", &self.zip);
        c.required("delivery.city", &self.city);
        c.required("delivery.address", &self.address);
        c.required("delivery.region", &self.region);
        if !looks_like_email(&self.email) {
            c.fail("delivery.email", "email", "must look like local@domain");
        }
    }
}

impl Payment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Checker::new();
        self.check(&mut c);
        c.finish()
    }

    fn check(&self, c: &mut Checker) {
        c.required("payment.transaction", &self.transaction);
        c.alphanumeric("payment.request_id", &self.request_id);
        if self.currency.len() != 3 || !self.currency.chars().all(|ch| ch.is_ascii_uppercase()) {
            c.fail(
                "payment.currency",
                "currency",
                "must be a three-letter uppercase code",
            );
        }
        c.required("payment.provider", &self.provider);
        c.positive_f64("payment.amount", self.amount);
        c.positive_i64("payment.payment_dt", self.payment_dt);
        c.required("payment.bank", &self.bank);
        c.non_negative_f64("payment.delivery_cost", self.delivery_cost);
        c.non_negative_f64("payment.goods_total", self.goods_total);
        c.non_negative_f64("payment.custom_fee", self.custom_fee);
    }
}

impl Item {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Checker::new();
        self.check(&mut c, 0);
        c.finish()
    }

    fn check(&self, c: &mut Checker, index: usize) {
        let field = |name: &str| format!("items[{index}].{name}");

        c.positive_i64(&field("chrt_id"), self.chrt_id);
        c.required(&field("track_number"), &self.track_number);
        c.alphanumeric(&field("track_number"), &self.track_number);
        c.positive_f64(&field("price"), self.price);
        c.required(&field("rid"), &self.rid);
        c.length_between(&field("name"), &self.name, 2, 100);
        if self.sale > 100 {
            c.fail(
                &field("sale"),
                "lte_100",
                format!("discount must be at most 100, got {}", self.sale),
            );
        }
        c.required(&field("size"), &self.size);
        c.positive_f64(&field("total_price"), self.total_price);
        c.positive_i64(&field("nm_id"), self.nm_id);
        if self.status == 0 {
            c.fail(&field("status"), "required", "status code must be set");
        }
        c.length_between(&field("brand"), &self.brand, 2, 50);
    }
}

fn looks_like_phone(phone: &str) -> bool {
    match phone.strip_prefix('+') {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.')
        }
        None => false,
    }
}
