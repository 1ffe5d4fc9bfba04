//! Market-data access port.

use std::fmt;

use crate::domain::error::StatArbError;
use crate::domain::market_data::PanelMatrix;
use chrono::NaiveDate;

/// One of the three date × asset inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Close,
    Volume,
    BookToMarket,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Close, Field::Volume, Field::BookToMarket];

    /// Config key naming the file that holds this field.
    pub fn config_key(&self) -> &'static str {
        match self {
            Field::Close => "close_file",
            Field::Volume => "volume_file",
            Field::BookToMarket => "book_to_market_file",
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            Field::Close => "close.csv",
            Field::Volume => "volume.csv",
            Field::BookToMarket => "book_to_market.csv",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Close => "close",
            Field::Volume => "volume",
            Field::BookToMarket => "book-to-market",
        };
        f.write_str(name)
    }
}

pub trait DataPort {
    /// Rows dated within `[start_date, end_date]`, in increasing date order.
    fn fetch_panel(
        &self,
        field: Field,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PanelMatrix, StatArbError>;

    fn list_assets(&self, field: Field) -> Result<Vec<String>, StatArbError>;

    /// First date, last date and row count, or `None` when the source is empty.
    fn get_data_range(
        &self,
        field: Field,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StatArbError>;
}
