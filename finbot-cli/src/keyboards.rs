use crate::telegram::{InlineKeyboardButton as Button, InlineKeyboardMarkup};

fn markup(rows: &[&[(&str, &str)]]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: rows
            .iter()
            .map(|row| row.iter().map(|(text, data)| Button::new(text, data)).collect())
            .collect(),
    }
}

pub fn main_menu() -> InlineKeyboardMarkup {
    markup(&[
        &[
            ("💰 Tambah Pemasukan", "add_income"),
            ("💸 Tambah Pengeluaran", "add_expense"),
        ],
        &[("📊 Laporan", "view_report"), ("💵 Cek Saldo", "check_balance")],
        &[
            ("🔍 Cari Transaksi", "search_transaction"),
            ("🤖 AI Assistant", "ai_help"),
        ],
        &[("🏷️ Kategori", "view_categories"), ("📚 Bantuan", "help")],
    ])
}

pub fn report_menu() -> InlineKeyboardMarkup {
    markup(&[
        &[("📅 Hari Ini", "daily_report"), ("📆 Minggu Ini", "weekly_report")],
        &[("🗓️ Bulan Ini", "monthly_report"), ("📈 Tahun Ini", "yearly_report")],
        &[("🔙 Kembali", "back_to_main")],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use finbot_core::intent_from_callback;

    #[test]
    fn test_every_button_routes_somewhere() {
        for kb in [main_menu(), report_menu()] {
            for button in kb.inline_keyboard.iter().flatten() {
                assert!(
                    intent_from_callback(&button.callback_data).is_some(),
                    "{} has no handler",
                    button.callback_data
                );
            }
        }
    }
}
