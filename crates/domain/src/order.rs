use serde::{Deserialize, Serialize};

/// The order aggregate: the unit of storage and caching.
///
/// Field names follow the wire JSON produced by the upstream order source,
/// so the same struct deserializes Kafka payloads and the hydrated rows the
/// database returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    #[serde(default)]
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: String,
    pub oof_shard: String,
}

/// Recipient and destination details for one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment details for one order. Monetary amounts are IEEE-754 doubles and
/// must survive the binary codec bit-exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction: String,
    #[serde(default)]
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: f64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: f64,
    pub goods_total: f64,
    pub custom_fee: f64,
}

/// A single line item of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: f64,
    pub rid: String,
    pub name: String,
    pub sale: u8,
    pub size: String,
    pub total_price: f64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test_order;

    #[test]
    fn test_order_json_round_trip() {
        let order = test_order("b563feb7b2b84b6test");
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }

    #[test]
    fn test_order_deserializes_without_optional_fields() {
        let order = test_order("b563feb7b2b84b6test");
        let mut value = serde_json::to_value(&order).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("internal_signature");
        obj["payment"].as_object_mut().unwrap().remove("request_id");

        let back: Order = serde_json::from_value(value).unwrap();
        assert_eq!(back.internal_signature, "");
        assert_eq!(back.payment.request_id, "");
    }

    #[test]
    fn test_order_json_field_names() {
        let order = test_order("uid1");
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["order_uid"], "uid1");
        assert_eq!(value["sm_id"], 99);
        assert_eq!(value["delivery"]["phone"], "+79000000000");
        assert_eq!(value["payment"]["payment_dt"], 1637907727);
        assert_eq!(value["items"][0]["chrt_id"], 9934930);
    }
}
