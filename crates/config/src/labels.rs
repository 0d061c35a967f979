//! Report headers and captions per locale.
//!
//! The engine never sees these; only the CLI and the exporter do.

use crate::settings::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub product_code: &'static str,
    pub product_name: &'static str,
    pub total_quantity: &'static str,
    pub share: &'static str,
    pub cumulative: &'static str,
    pub tier: &'static str,

    pub tier_count: [&'static str; 3],
    pub unique_products: &'static str,
    pub total_sold: &'static str,
    pub tier_percent: &'static str,
    pub top_product: &'static str,
    pub sales: &'static str,
    pub no_sales: &'static str,

    pub duplicates_removed: &'static str,
    pub records_added: &'static str,
    pub records_deleted: &'static str,
    pub skipped: &'static str,
    pub update_completed: &'static str,
    pub no_files: &'static str,
    pub sheet_name: &'static str,
}

const EN: Labels = Labels {
    product_code: "Product Code",
    product_name: "Product Name",
    total_quantity: "Total Sales",
    share: "Sales Percentage",
    cumulative: "Cumulative Percentage",
    tier: "ABC Category",

    tier_count: [
        "Number of products in category A",
        "Number of products in category B",
        "Number of products in category C",
    ],
    unique_products: "Total number of unique sold products",
    total_sold: "Total sales",
    tier_percent: "Percentage occurrence of products in each category",
    top_product: "TOP Product",
    sales: "Sales",
    no_sales: "No sales in the selected period.",

    duplicates_removed: "Removed {n} duplicates from the '{table}' table.",
    records_added: "Added {n} new records to the '{table}' table.",
    records_deleted: "Deleted {n} records from the '{table}' table.",
    skipped: "Skipping '{table}': {reason}",
    update_completed: "Update completed.",
    no_files: "No files.",
    sheet_name: "ABC Analysis",
};

const PL: Labels = Labels {
    product_code: "Kod Produktu",
    product_name: "Nazwa Produktu",
    total_quantity: "Suma Sprzedaży",
    share: "Procent Sprzedaży",
    cumulative: "Narastająco",
    tier: "Analiza ABC",

    tier_count: [
        "Liczba produktów dla kategorii A",
        "Liczba produktów dla kategorii B",
        "Liczba produktów dla kategorii C",
    ],
    unique_products: "Liczba unikalnych sprzedanych produktów",
    total_sold: "Całkowita liczba sprzedanych produktów",
    tier_percent: "Procentowe wystąpienie produktów w poszczególnej kategorii",
    top_product: "TOP Produkt",
    sales: "Sprzedaż",
    no_sales: "Brak sprzedaży w wybranym okresie.",

    duplicates_removed: "Usunięto {n} duplikatów w tabeli '{table}'.",
    records_added: "Do tabeli '{table}' dodano {n} nowych rekordów.",
    records_deleted: "Z tabeli '{table}' usunięto {n} rekordów.",
    skipped: "Pomijanie '{table}': {reason}",
    update_completed: "Aktualizacja zakończona.",
    no_files: "Brak plików.",
    sheet_name: "Analiza ABC",
};

impl Labels {
    pub fn for_locale(locale: Locale) -> &'static Labels {
        match locale {
            Locale::En => &EN,
            Locale::Pl => &PL,
        }
    }

    /// Headers of the classification table, in column order.
    pub fn classification_headers(&self) -> [&'static str; 6] {
        [
            self.product_code,
            self.product_name,
            self.total_quantity,
            self.share,
            self.cumulative,
            self.tier,
        ]
    }

    /// Fill a per-table message template.
    pub fn table_message(template: &str, table: &str, n: usize) -> String {
        template.replace("{table}", table).replace("{n}", &n.to_string())
    }

    pub fn skipped_message(&self, table: &str, reason: &str) -> String {
        self.skipped.replace("{table}", table).replace("{reason}", reason)
    }
}
