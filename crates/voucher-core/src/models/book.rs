//! In-memory list of vouchers being prepared for printing.

use uuid::Uuid;

use super::voucher::{VoucherRecord, VoucherUpdate};

/// Ordered collection of vouchers for one session.
#[derive(Debug, Clone, Default)]
pub struct VoucherBook {
    vouchers: Vec<VoucherRecord>,
}

impl VoucherBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append vouchers in the given order.
    pub fn add_vouchers(&mut self, vouchers: impl IntoIterator<Item = VoucherRecord>) {
        self.vouchers.extend(vouchers);
    }

    /// Edit a voucher in place. Returns `false` if `id` is unknown.
    pub fn update(&mut self, id: Uuid, update: VoucherUpdate) -> bool {
        match self.vouchers.iter_mut().find(|v| v.id() == id) {
            Some(voucher) => {
                voucher.apply(update);
                true
            }
            None => false,
        }
    }

    /// Remove a voucher. Returns `false` if `id` is unknown.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.vouchers.len();
        self.vouchers.retain(|v| v.id() != id);
        self.vouchers.len() != before
    }

    pub fn clear(&mut self) {
        self.vouchers.clear();
    }

    pub fn get(&self, id: Uuid) -> Option<&VoucherRecord> {
        self.vouchers.iter().find(|v| v.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoucherRecord> {
        self.vouchers.iter()
    }

    pub fn len(&self) -> usize {
        self.vouchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vouchers.is_empty()
    }

    pub fn into_vec(self) -> Vec<VoucherRecord> {
        self.vouchers
    }
}
