use std::{fmt, str::FromStr};

use url::Url;

use crate::error::{Error, Result};

pub const BASE_URL: &str = "https://api.xero.com/";

/// The API sets a resource path can be resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiSet {
    /// Accounting API, `api.xro/2.0`.
    #[default]
    Core,
    /// Payroll API, `payroll.xro/1.0`.
    Payroll,
    /// Files API, `files.xro/1.0`.
    File,
}

impl ApiSet {
    /// The versioned path prefix of this API set.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Core => "api.xro/2.0/",
            Self::Payroll => "payroll.xro/1.0/",
            Self::File => "files.xro/1.0/",
        }
    }

    /// Resolves `segments` under this API set on the given host.
    ///
    /// Every entry is percent-encoded as exactly one path segment, so `/`,
    /// `?` and `#` inside an object id stay part of that id.
    pub fn url(self, base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.join(self.prefix()).map_err(|_| Error::InvalidEndpoint)?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidEndpoint)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// HTTP methods understood by the resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(()),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// The API path segment and supported methods of a resource collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub slug: &'static str,
    pub allowed_methods: &'static [HttpMethod],
}

impl ResourceDescriptor {
    #[must_use]
    pub fn supports(&self, method: HttpMethod) -> bool {
        self.allowed_methods.contains(&method)
    }
}

const GET: &[HttpMethod] = &[HttpMethod::Get];
const GET_PUT: &[HttpMethod] = &[HttpMethod::Get, HttpMethod::Put];
const GET_PUT_POST: &[HttpMethod] = &[HttpMethod::Get, HttpMethod::Put, HttpMethod::Post];
const GET_PUT_POST_DELETE: &[HttpMethod] = &[
    HttpMethod::Get,
    HttpMethod::Put,
    HttpMethod::Post,
    HttpMethod::Delete,
];

macro_rules! commands {
    ($($variant:ident => $name:literal, $slug:literal, $methods:ident;)+) => {
        /// A resource command of the Xero accounting API.
        ///
        /// Commands are looked up case-insensitively from their lower-case name,
        /// e.g. `"Invoices"` and `"invoices"` both map to [`Command::Invoices`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Command {
            $($variant,)+
        }

        impl Command {
            /// Every command, in table order.
            pub const ALL: &'static [Command] = &[$(Command::$variant,)+];

            /// The lower-case command name.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// The resource descriptor for this command.
            #[must_use]
            pub fn descriptor(self) -> ResourceDescriptor {
                match self {
                    $(Self::$variant => ResourceDescriptor { slug: $slug, allowed_methods: $methods },)+
                }
            }
        }

        impl FromStr for Command {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let name = s.to_lowercase();
                match name.as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(Error::UnknownCommand(name)),
                }
            }
        }
    };
}

commands! {
    Attachments => "attachments", "Attachments", GET_PUT_POST;
    Accounts => "accounts", "Accounts", GET_PUT_POST_DELETE;
    BankTransactions => "banktransactions", "BankTransactions", GET_PUT_POST;
    BankTransfers => "banktransfers", "BankTransfers", GET_PUT;
    BrandingThemes => "brandingthemes", "BrandingThemes", GET;
    Contacts => "contacts", "Contacts", GET_PUT_POST;
    ContactGroups => "contactgroups", "ContactGroups", GET_PUT_POST_DELETE;
    CreditNotes => "creditnotes", "CreditNotes", GET_PUT_POST;
    Currencies => "currencies", "Currencies", GET;
    Employees => "employees", "Employees", GET_PUT_POST;
    ExpenseClaims => "expenseclaims", "ExpenseClaims", GET_PUT_POST;
    Invoices => "invoices", "Invoices", GET_PUT_POST;
    InvoiceReminders => "invoicereminders", "InvoiceReminders", GET;
    Items => "items", "Items", GET_PUT_POST_DELETE;
    Journals => "journals", "Journals", GET;
    LinkedTransactions => "linkedtransactions", "LinkedTransactions", GET_PUT_POST_DELETE;
    ManualJournals => "manualjournals", "ManualJournals", GET_PUT_POST;
    Organisation => "organisation", "Organisation", GET;
    Overpayments => "overpayments", "Overpayments", GET_PUT;
    Payments => "payments", "Payments", GET_PUT_POST;
    Prepayments => "prepayments", "Prepayments", GET_PUT;
    PurchaseOrders => "purchaseorders", "PurchaseOrders", GET_PUT_POST;
    Receipts => "receipts", "Receipts", GET_PUT_POST;
    RepeatingInvoices => "repeatinginvoices", "RepeatingInvoices", GET;
    Reports => "reports", "Reports", GET;
    TaxRates => "taxrates", "TaxRates", GET_PUT_POST;
    TrackingCategories => "trackingcategories", "TrackingCategories", GET_PUT_POST_DELETE;
    Users => "users", "Users", GET;
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!("Invoices".parse::<Command>().unwrap(), Command::Invoices);
        assert_eq!("PURCHASEORDERS".parse::<Command>().unwrap(), Command::PurchaseOrders);
        assert_eq!(Command::ALL.len(), 28);
    }

    #[test]
    fn unknown_command_reports_lowercased_name() {
        match "Quotes".parse::<Command>() {
            Err(Error::UnknownCommand(name)) => assert_eq!(name, "quotes"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }

    #[test]
    fn names_round_trip_through_the_table() {
        for command in Command::ALL {
            assert_eq!(command.name().parse::<Command>().unwrap(), *command);
            assert!(command.descriptor().supports(HttpMethod::Get));
        }
    }

    #[test]
    fn invoices_cannot_be_deleted() {
        assert!(!Command::Invoices.descriptor().supports(HttpMethod::Delete));
    }

    #[test]
    fn api_sets_resolve_under_the_host() {
        let base = Url::parse(BASE_URL).unwrap();
        assert_eq!(
            ApiSet::Core.url(&base, &["Contacts"]).unwrap().as_str(),
            "https://api.xero.com/api.xro/2.0/Contacts"
        );
        assert_eq!(
            ApiSet::Payroll.url(&base, &["Employees", "EMP-1"]).unwrap().as_str(),
            "https://api.xero.com/payroll.xro/1.0/Employees/EMP-1"
        );
    }

    #[test]
    fn segments_are_encoded_in_place() {
        let base = Url::parse(BASE_URL).unwrap();
        let url = ApiSet::Core
            .url(&base, &["Invoices", "INV/2024/7?where=Total>0#x"])
            .unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 4);
        assert!(url.path().starts_with("/api.xro/2.0/Invoices/INV%2F2024%2F7"));
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }
}
