//! In-memory order directory backing the TTN and receipt flows.
//!
//! Stands in for the fulfilment system until the real integration lands;
//! the handler layer only sees `lookup_*` so swapping the backend later is
//! contained here.

use std::collections::HashMap;

/// Shipment tracking data for one order.
#[derive(Debug, Clone)]
pub struct TtnRecord {
    pub order_number: String,
    pub ttn: String,
    pub status: String,
    pub delivery_date: String,
    pub recipient: String,
    pub address: String,
}

/// Purchase receipt data for one order.
#[derive(Debug, Clone)]
pub struct ReceiptRecord {
    pub order_number: String,
    pub receipt_number: String,
    pub amount: f64,
    pub date: String,
    pub items: Vec<String>,
}

/// Keyed lookup of demo order documents.
pub struct OrderDirectory {
    ttns: HashMap<String, TtnRecord>,
    receipts: HashMap<String, ReceiptRecord>,
}

impl OrderDirectory {
    /// Directory with the seeded demo orders (12345, 67890, 11111).
    pub fn seeded() -> Self {
        let ttns = [
            TtnRecord {
                order_number: "12345".into(),
                ttn: "TTN-2024-001234".into(),
                status: "In transit".into(),
                delivery_date: "2024-12-05".into(),
                recipient: "Ivan Ivanov".into(),
                address: "Kyiv, Khreshchatyk St 1, apt 10".into(),
            },
            TtnRecord {
                order_number: "67890".into(),
                ttn: "TTN-2024-005678".into(),
                status: "Delivered".into(),
                delivery_date: "2024-12-01".into(),
                recipient: "Maria Petrova".into(),
                address: "Kyiv, Shevchenko St 25, apt 5".into(),
            },
            TtnRecord {
                order_number: "11111".into(),
                ttn: "TTN-2024-001111".into(),
                status: "Awaiting dispatch".into(),
                delivery_date: "2024-12-10".into(),
                recipient: "Petro Sydorov".into(),
                address: "Kyiv, Peremohy Ave 50, apt 20".into(),
            },
        ];
        let receipts = [
            ReceiptRecord {
                order_number: "12345".into(),
                receipt_number: "RCP-2024-001234".into(),
                amount: 1500.00,
                date: "2024-11-28".into(),
                items: vec!["Item 1".into(), "Item 2".into(), "Item 3".into()],
            },
            ReceiptRecord {
                order_number: "67890".into(),
                receipt_number: "RCP-2024-005678".into(),
                amount: 2500.50,
                date: "2024-11-25".into(),
                items: vec!["Item A".into(), "Item B".into()],
            },
            ReceiptRecord {
                order_number: "11111".into(),
                receipt_number: "RCP-2024-001111".into(),
                amount: 999.99,
                date: "2024-11-30".into(),
                items: vec!["Item X".into()],
            },
        ];

        Self {
            ttns: ttns
                .into_iter()
                .map(|record| (record.order_number.clone(), record))
                .collect(),
            receipts: receipts
                .into_iter()
                .map(|record| (record.order_number.clone(), record))
                .collect(),
        }
    }

    pub fn lookup_ttn(&self, order_number: &str) -> Option<&TtnRecord> {
        self.ttns.get(order_number.trim())
    }

    pub fn lookup_receipt(&self, order_number: &str) -> Option<&ReceiptRecord> {
        self.receipts.get(order_number.trim())
    }

    pub fn ttn_orders(&self) -> Vec<&str> {
        self.ttns.keys().map(String::as_str).collect()
    }

    pub fn receipt_orders(&self) -> Vec<&str> {
        self.receipts.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_orders_resolve_both_documents() {
        let directory = OrderDirectory::seeded();
        let ttn = directory.lookup_ttn("12345").unwrap();
        assert_eq!(ttn.ttn, "TTN-2024-001234");

        let receipt = directory.lookup_receipt("12345").unwrap();
        assert_eq!(receipt.amount, 1500.00);
    }

    #[test]
    fn unknown_order_misses() {
        let directory = OrderDirectory::seeded();
        assert!(directory.lookup_ttn("99999").is_none());
        assert!(directory.lookup_receipt("99999").is_none());
    }

    #[test]
    fn lookup_trims_surrounding_whitespace() {
        let directory = OrderDirectory::seeded();
        assert!(directory.lookup_ttn("  12345 ").is_some());
    }
}
