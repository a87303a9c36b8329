//! Persisted-state snapshot file format (§6 "Persisted state"):
//! positions and open orders, hydrated by the supervisor on startup and
//! written on a clean shutdown. Little-endian, magic-tagged, CRC32-
//! checked.

use crate::core::errors::SnapshotError;
use crate::core::types::{Order, OrderId, OrderState, OrderType, PositionSnapshot, Side, Tif};
use crc32fast::Hasher;

const MAGIC: u32 = 0x4846_5453;
const VERSION: u32 = 1;

/// A fully decoded snapshot: positions plus open orders, ready to hand to
/// [`crate::position::PositionStore::restore`] and re-submit to the OMS.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub session_id: u64,
    pub positions: Vec<PositionSnapshot>,
    pub open_orders: Vec<Order>,
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_i64(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_position(buf: &mut Vec<u8>, p: &PositionSnapshot) {
    write_u32(buf, p.symbol_id);
    write_i64(buf, p.net_qty);
    write_i64(buf, p.long_qty);
    write_i64(buf, p.short_qty);
    write_u64(buf, p.avg_long_px);
    write_u64(buf, p.avg_short_px);
    write_i64(buf, p.unrealized_pnl);
    write_i64(buf, p.realized_pnl);
    write_u64(buf, p.last_update_tsc);
}

const POSITION_RECORD_LEN: usize = 4 + 8 * 8;

fn read_position(buf: &[u8]) -> PositionSnapshot {
    let symbol_id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    let net_qty = i64::from_le_bytes(buf[4..12].try_into().unwrap());
    let long_qty = i64::from_le_bytes(buf[12..20].try_into().unwrap());
    let short_qty = i64::from_le_bytes(buf[20..28].try_into().unwrap());
    let avg_long_px = u64::from_le_bytes(buf[28..36].try_into().unwrap());
    let avg_short_px = u64::from_le_bytes(buf[36..44].try_into().unwrap());
    let unrealized_pnl = i64::from_le_bytes(buf[44..52].try_into().unwrap());
    let realized_pnl = i64::from_le_bytes(buf[52..60].try_into().unwrap());
    let last_update_tsc = u64::from_le_bytes(buf[60..68].try_into().unwrap());
    PositionSnapshot { symbol_id, net_qty, long_qty, short_qty, avg_long_px, avg_short_px, unrealized_pnl, realized_pnl, last_update_tsc }
}

const ORDER_RECORD_LEN: usize = 8 + 4 + 1 + 1 + 1 + 1 + 8 + 8 + 8 + 8 + 8 + 4 + 2 + 8;

fn write_order(buf: &mut Vec<u8>, o: &Order) {
    write_u64(buf, o.order_id.as_u64());
    write_u32(buf, o.symbol_id);
    buf.push(o.side as u8);
    buf.push(o.state as u8);
    buf.push(o.order_type as u8);
    buf.push(o.tif as u8);
    write_u64(buf, o.price);
    write_u64(buf, o.quantity);
    write_u64(buf, o.filled_qty);
    write_u64(buf, o.created_tsc);
    write_u64(buf, o.last_update_tsc);
    write_u32(buf, o.strategy_id);
    buf.extend_from_slice(&o.venue_id.to_le_bytes());
    write_u64(buf, o.client_order_id);
}

fn side_from_u8(v: u8) -> Result<Side, SnapshotError> {
    match v {
        0 => Ok(Side::Buy),
        1 => Ok(Side::Sell),
        _ => Err(SnapshotError::Truncated { needed: 0, found: 0 }),
    }
}

fn order_state_from_u8(v: u8) -> OrderState {
    match v {
        0 => OrderState::Pending,
        1 => OrderState::Submitted,
        2 => OrderState::Acknowledged,
        3 => OrderState::PartiallyFilled,
        4 => OrderState::Filled,
        5 => OrderState::Rejected,
        6 => OrderState::Cancelled,
        _ => OrderState::Expired,
    }
}

fn order_type_from_u8(v: u8) -> OrderType {
    match v {
        0 => OrderType::Market,
        1 => OrderType::Limit,
        2 => OrderType::Stop,
        3 => OrderType::StopLimit,
        _ => OrderType::Iceberg,
    }
}

fn tif_from_u8(v: u8) -> Tif {
    match v {
        0 => Tif::IOC,
        1 => Tif::FOK,
        2 => Tif::GTC,
        3 => Tif::Day,
        _ => Tif::GTD,
    }
}

fn read_order(buf: &[u8]) -> Result<Order, SnapshotError> {
    let order_id = OrderId::new(u64::from_le_bytes(buf[0..8].try_into().unwrap()));
    let symbol_id = u32::from_le_bytes(buf[8..12].try_into().unwrap());
    let side = side_from_u8(buf[12])?;
    let state = order_state_from_u8(buf[13]);
    let order_type = order_type_from_u8(buf[14]);
    let tif = tif_from_u8(buf[15]);
    let price = u64::from_le_bytes(buf[16..24].try_into().unwrap());
    let quantity = u64::from_le_bytes(buf[24..32].try_into().unwrap());
    let filled_qty = u64::from_le_bytes(buf[32..40].try_into().unwrap());
    let created_tsc = u64::from_le_bytes(buf[40..48].try_into().unwrap());
    let last_update_tsc = u64::from_le_bytes(buf[48..56].try_into().unwrap());
    let strategy_id = u32::from_le_bytes(buf[56..60].try_into().unwrap());
    let venue_id = u16::from_le_bytes(buf[60..62].try_into().unwrap());
    let client_order_id = u64::from_le_bytes(buf[62..70].try_into().unwrap());
    Ok(Order {
        order_id,
        symbol_id,
        side,
        state,
        order_type,
        tif,
        price,
        quantity,
        filled_qty,
        created_tsc,
        last_update_tsc,
        strategy_id,
        venue_id,
        client_order_id,
    })
}

/// Serialize a snapshot to the on-disk layout, appending a trailing
/// CRC32 of everything after the magic+version+session-id header.
pub fn encode(snapshot: &Snapshot) -> Vec<u8> {
    let mut payload = Vec::new();
    write_u64(&mut payload, snapshot.session_id);
    write_u32(&mut payload, snapshot.positions.len() as u32);
    for p in &snapshot.positions {
        write_position(&mut payload, p);
    }
    write_u32(&mut payload, snapshot.open_orders.len() as u32);
    for o in &snapshot.open_orders {
        write_order(&mut payload, o);
    }

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(8 + payload.len() + 4);
    write_u32(&mut out, MAGIC);
    write_u32(&mut out, VERSION);
    out.extend_from_slice(&payload);
    write_u32(&mut out, crc);
    out
}

/// Parse and validate a snapshot file's bytes.
pub fn decode(bytes: &[u8]) -> Result<Snapshot, SnapshotError> {
    if bytes.len() < 12 {
        return Err(SnapshotError::Truncated { needed: 12, found: bytes.len() });
    }
    let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(SnapshotError::BadMagic(magic));
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    if bytes.len() < 12 {
        return Err(SnapshotError::Truncated { needed: 12, found: bytes.len() });
    }
    let payload = &bytes[8..bytes.len() - 4];
    let expected_crc = u32::from_le_bytes(bytes[bytes.len() - 4..].try_into().unwrap());
    let mut hasher = Hasher::new();
    hasher.update(payload);
    let computed_crc = hasher.finalize();
    if computed_crc != expected_crc {
        return Err(SnapshotError::CrcMismatch { expected: expected_crc, computed: computed_crc });
    }

    let mut cursor = 0usize;
    let need = |cursor: usize, n: usize| -> Result<(), SnapshotError> {
        if payload.len() < cursor + n {
            Err(SnapshotError::Truncated { needed: cursor + n, found: payload.len() })
        } else {
            Ok(())
        }
    };

    need(cursor, 8)?;
    let session_id = u64::from_le_bytes(payload[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;

    need(cursor, 4)?;
    let position_count = u32::from_le_bytes(payload[cursor..cursor + 4].try_into().unwrap()) as usize;
    cursor += 4;

    let mut positions = Vec::with_capacity(position_count);
    for _ in 0..position_count {
        need(cursor, POSITION_RECORD_LEN)?;
        positions.push(read_position(&payload[cursor..cursor + POSITION_RECORD_LEN]));
        cursor += POSITION_RECORD_LEN;
    }

    need(cursor, 4)?;
    let order_count = u32::from_le_bytes(payload[cursor..cursor + 4].try_into().unwrap()) as usize;
    cursor += 4;

    let mut open_orders = Vec::with_capacity(order_count);
    for _ in 0..order_count {
        need(cursor, ORDER_RECORD_LEN)?;
        open_orders.push(read_order(&payload[cursor..cursor + ORDER_RECORD_LEN])?);
        cursor += ORDER_RECORD_LEN;
    }

    Ok(Snapshot { session_id, positions, open_orders })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position(symbol_id: u32) -> PositionSnapshot {
        PositionSnapshot {
            symbol_id,
            net_qty: 10,
            long_qty: 10,
            short_qty: 0,
            avg_long_px: 100,
            avg_short_px: 0,
            unrealized_pnl: 0,
            realized_pnl: 50,
            last_update_tsc: 123,
        }
    }

    fn sample_order(id: u64) -> Order {
        Order {
            order_id: OrderId::new(id),
            symbol_id: 1,
            side: Side::Buy,
            state: OrderState::Acknowledged,
            order_type: OrderType::Limit,
            tif: Tif::GTC,
            price: 100,
            quantity: 10,
            filled_qty: 0,
            created_tsc: 1,
            last_update_tsc: 2,
            strategy_id: 1,
            venue_id: 0,
            client_order_id: 0,
        }
    }

    #[test]
    fn round_trips_positions_and_orders() {
        let snap = Snapshot {
            session_id: 42,
            positions: vec![sample_position(1), sample_position(2)],
            open_orders: vec![sample_order(1)],
        };
        let bytes = encode(&snap);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, snap);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = encode(&Snapshot { session_id: 1, positions: vec![], open_orders: vec![] });
        bytes[0] = 0;
        assert!(matches!(decode(&bytes), Err(SnapshotError::BadMagic(_))));
    }

    #[test]
    fn rejects_corrupted_crc() {
        let mut bytes = encode(&Snapshot { session_id: 1, positions: vec![sample_position(1)], open_orders: vec![] });
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(decode(&bytes), Err(SnapshotError::CrcMismatch { .. })));
    }

    #[test]
    fn rejects_truncated_payload() {
        let bytes = encode(&Snapshot { session_id: 1, positions: vec![sample_position(1)], open_orders: vec![] });
        let truncated = &bytes[..bytes.len() - 10];
        assert!(matches!(decode(truncated), Err(SnapshotError::Truncated { .. }) | Err(SnapshotError::CrcMismatch { .. })));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = encode(&Snapshot { session_id: 1, positions: vec![], open_orders: vec![] });
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(SnapshotError::UnsupportedVersion(99))));
    }
}
