//! Encode/decode of the order aggregate and its value objects.
//!
//! Each value object is encoded standalone so its layout can change (or be
//! tested) without touching the parent, and the parent embeds it behind a
//! length prefix.

use crate::bytes::{ByteReader, ByteWriter};
use crate::CodecError;
use domain::{Delivery, Item, Order, Payment};

/// Encode a full aggregate. Never fails for a structurally valid value.
pub fn encode_order(order: &Order) -> Vec<u8> {
    let mut w = ByteWriter::new();

    for s in [
        &order.order_uid,
        &order.track_number,
        &order.entry,
        &order.locale,
        &order.internal_signature,
        &order.customer_id,
        &order.delivery_service,
        &order.shardkey,
        &order.date_created,
        &order.oof_shard,
    ] {
        w.put_string(s);
    }
    w.put_i64(order.sm_id);

    w.put_block(&encode_delivery(&order.delivery));
    w.put_block(&encode_payment(&order.payment));

    w.put_u32(order.items.len() as u32);
    for item in &order.items {
        w.put_block(&encode_item(item));
    }

    w.into_vec()
}

/// Decode a full aggregate. Fails on truncated or corrupted input, never
/// panics; leftover bytes after the last item are rejected.
pub fn decode_order(data: &[u8]) -> Result<Order, CodecError> {
    let mut r = ByteReader::new(data);

    let order_uid = r.get_string("order_uid")?;
    let track_number = r.get_string("track_number")?;
    let entry = r.get_string("entry")?;
    let locale = r.get_string("locale")?;
    let internal_signature = r.get_string("internal_signature")?;
    let customer_id = r.get_string("customer_id")?;
    let delivery_service = r.get_string("delivery_service")?;
    let shardkey = r.get_string("shardkey")?;
    let date_created = r.get_string("date_created")?;
    let oof_shard = r.get_string("oof_shard")?;
    let sm_id = r.get_i64("sm_id")?;

    let delivery = decode_delivery(r.get_block("delivery")?)?;
    let payment = decode_payment(r.get_block("payment")?)?;

    let count = r.get_u32("items count")? as usize;
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        items.push(decode_item(r.get_block("item")?)?);
    }

    if r.remaining() > 0 {
        return Err(CodecError::TrailingBytes {
            context: "order",
            remaining: r.remaining(),
        });
    }

    Ok(Order {
        order_uid,
        track_number,
        entry,
        delivery,
        payment,
        items,
        locale,
        internal_signature,
        customer_id,
        delivery_service,
        shardkey,
        sm_id,
        date_created,
        oof_shard,
    })
}

pub fn encode_delivery(d: &Delivery) -> Vec<u8> {
    let mut w = ByteWriter::new();
    for s in [
        &d.name, &d.phone, &d.zip, &d.city, &d.address, &d.region, &d.email,
    ] {
        w.put_string(s);
    }
    w.into_vec()
}

pub fn decode_delivery(data: &[u8]) -> Result<Delivery, CodecError> {
    let mut r = ByteReader::new(data);
    Ok(Delivery {
        name: r.get_string("delivery.name")?,
        phone: r.get_string("delivery.phone")?,
        zip: r.get_string("delivery.zip")?,
        city: r.get_string("delivery.city")?,
        address: r.get_string("delivery.address")?,
        region: r.get_string("delivery.region")?,
        email: r.get_string("delivery.email")?,
    })
}

pub fn encode_payment(p: &Payment) -> Vec<u8> {
    let mut w = ByteWriter::new();
    for s in [&p.transaction, &p.request_id, &p.currency, &p.provider, &p.bank] {
        w.put_string(s);
    }
    for f in [p.amount, p.delivery_cost, p.goods_total, p.custom_fee] {
        w.put_f64(f);
    }
    w.put_i64(p.payment_dt);
    w.into_vec()
}

pub fn decode_payment(data: &[u8]) -> Result<Payment, CodecError> {
    let mut r = ByteReader::new(data);
    Ok(Payment {
        transaction: r.get_string("payment.transaction")?,
        request_id: r.get_string("payment.request_id")?,
        currency: r.get_string("payment.currency")?,
        provider: r.get_string("payment.provider")?,
        bank: r.get_string("payment.bank")?,
        amount: r.get_f64("payment.amount")?,
        delivery_cost: r.get_f64("payment.delivery_cost")?,
        goods_total: r.get_f64("payment.goods_total")?,
        custom_fee: r.get_f64("payment.custom_fee")?,
        payment_dt: r.get_i64("payment.payment_dt")?,
    })
}

pub fn encode_item(i: &Item) -> Vec<u8> {
    let mut w = ByteWriter::new();
    for s in [&i.track_number, &i.rid, &i.name, &i.size, &i.brand] {
        w.put_string(s);
    }
    w.put_i64(i.chrt_id);
    w.put_f64(i.price);
    w.put_u8(i.sale);
    w.put_f64(i.total_price);
    w.put_i64(i.nm_id);
    w.put_i32(i.status);
    w.into_vec()
}

pub fn decode_item(data: &[u8]) -> Result<Item, CodecError> {
    let mut r = ByteReader::new(data);
    Ok(Item {
        track_number: r.get_string("item.track_number")?,
        rid: r.get_string("item.rid")?,
        name: r.get_string("item.name")?,
        size: r.get_string("item.size")?,
        brand: r.get_string("item.brand")?,
        chrt_id: r.get_i64("item.chrt_id")?,
        price: r.get_f64("item.price")?,
        sale: r.get_u8("item.sale")?,
        total_price: r.get_f64("item.total_price")?,
        nm_id: r.get_i64("item.nm_id")?,
        status: r.get_i32("item.status")?,
    })
}
