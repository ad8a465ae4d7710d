use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::traits::TransferStream;
use crate::domain::{Account, AccountId, Error, Transfer};

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Streams `from,to,amount` rows as transfer requests.
pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(csv_reader(reader)),
        }
    }
}

impl<R: Read + Send + 'static> TransferStream for CsvReader<R> {
    type Stream = Pin<Box<dyn Stream<Item = Result<Transfer, Error>> + Send>>;

    fn stream(&mut self) -> Self::Stream {
        let Some(reader) = self.reader.take() else {
            // Already consumed.
            return Box::pin(stream::empty::<Result<Transfer, Error>>());
        };

        let iter = reader.into_deserialize::<Transfer>().map(|row| {
            row.map_err(|e| Error::Ingestion(format!("CSV deserialization error: {}", e)))
        });

        Box::pin(stream::iter(iter))
    }
}

/// Seed row of the accounts file.
#[derive(Debug, Deserialize)]
struct AccountRow {
    account: AccountId,
    #[serde(with = "rust_decimal::serde::str")]
    balance: Decimal,
}

impl TryFrom<AccountRow> for Account {
    type Error = Error;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        if row.balance < Decimal::ZERO {
            return Err(Error::Ingestion(format!(
                "Account {} has negative opening balance {}",
                row.account, row.balance
            )));
        }
        Ok(Account::with_balance(row.account, row.balance))
    }
}

/// Reads every `account,balance` row. The first bad row aborts the load.
pub fn read_accounts<R: Read>(reader: R) -> Result<Vec<Account>, Error> {
    csv_reader(reader)
        .into_deserialize::<AccountRow>()
        .map(|row| {
            row.map_err(|e| Error::Ingestion(format!("CSV deserialization error: {}", e)))
                .and_then(Account::try_from)
        })
        .collect()
}
