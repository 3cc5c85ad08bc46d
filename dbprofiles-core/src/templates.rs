//! Static driver template table.
//!
//! Each template tells a form renderer which fields to show for a driver
//! and with which defaults. The table is configuration data and never
//! changes at runtime.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// Input type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text
    Text,
    /// Masked text
    Password,
    /// Numeric input
    Number,
}

/// Default value pre-filled into a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldDefault {
    /// Text default
    Text(&'static str),
    /// Numeric default
    Number(u16),
}

/// One field of a driver form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Form field identifier, matching the save request keys
    pub id: &'static str,
    /// Human-readable label
    pub label: &'static str,
    /// Input type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Optional default value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
}

/// Form template for one driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverTemplate {
    /// User-facing label, e.g. `PostgreSQL`
    #[serde(skip)]
    pub label: &'static str,
    /// Driver identifier written to `drivername`
    pub driver: &'static str,
    /// Ordered field specs
    pub fields: &'static [FieldSpec],
}

impl DriverTemplate {
    /// Looks up a field by id.
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// Default port declared by the template, if any.
    pub fn default_port(&self) -> Option<u16> {
        match self.field("port")?.default? {
            FieldDefault::Number(port) => Some(port),
            FieldDefault::Text(_) => None,
        }
    }
}

const fn alias_field(default: &'static str) -> FieldSpec {
    FieldSpec {
        id: "connectionName",
        label: "Connection alias",
        field_type: FieldType::Text,
        default: Some(FieldDefault::Text(default)),
    }
}

const fn text(id: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        id,
        label,
        field_type: FieldType::Text,
        default: None,
    }
}

const PATH_FIELD: FieldSpec = FieldSpec {
    id: "database",
    label: "Path to database",
    field_type: FieldType::Text,
    default: Some(FieldDefault::Text(":memory:")),
};

const USERNAME: FieldSpec = text("username", "Username");
const HOST: FieldSpec = text("host", "Host");
const DATABASE: FieldSpec = text("database", "Database");
const PASSWORD: FieldSpec = FieldSpec {
    id: "password",
    label: "Password",
    field_type: FieldType::Password,
    default: None,
};

const fn port(default: u16) -> FieldSpec {
    FieldSpec {
        id: "port",
        label: "Port",
        field_type: FieldType::Number,
        default: Some(FieldDefault::Number(default)),
    }
}

static TEMPLATES: [DriverTemplate; 9] = [
    DriverTemplate {
        label: "DuckDB",
        driver: "duckdb",
        fields: &[alias_field("duckdb"), PATH_FIELD],
    },
    DriverTemplate {
        label: "SQLite",
        driver: "sqlite",
        fields: &[alias_field("sqlite"), PATH_FIELD],
    },
    DriverTemplate {
        label: "PostgreSQL",
        driver: "postgresql",
        fields: &[
            alias_field("postgresql"),
            USERNAME,
            PASSWORD,
            HOST,
            DATABASE,
            port(5432),
        ],
    },
    DriverTemplate {
        label: "MySQL",
        driver: "mysql+pymysql",
        fields: &[
            alias_field("mysql"),
            USERNAME,
            PASSWORD,
            HOST,
            port(3306),
            DATABASE,
        ],
    },
    DriverTemplate {
        label: "MariaDB",
        driver: "mariadb",
        fields: &[
            alias_field("mariadb"),
            USERNAME,
            PASSWORD,
            HOST,
            port(3306),
            DATABASE,
        ],
    },
    DriverTemplate {
        label: "Snowflake",
        driver: "snowflake",
        fields: &[
            alias_field("snowflake"),
            USERNAME,
            PASSWORD,
            HOST,
            port(443),
            DATABASE,
        ],
    },
    DriverTemplate {
        label: "Oracle",
        driver: "oracle+oracledb",
        fields: &[
            alias_field("oracle"),
            USERNAME,
            PASSWORD,
            HOST,
            DATABASE,
            port(1521),
        ],
    },
    DriverTemplate {
        label: "MSSQL",
        driver: "mssql+pyodbc",
        fields: &[
            alias_field("mssql"),
            USERNAME,
            PASSWORD,
            HOST,
            DATABASE,
            port(1433),
        ],
    },
    DriverTemplate {
        label: "Redshift",
        driver: "redshift+redshift_connector",
        fields: &[
            alias_field("redshift"),
            USERNAME,
            PASSWORD,
            HOST,
            DATABASE,
            port(5439),
        ],
    },
];

/// All driver templates, in display order.
pub fn all() -> &'static [DriverTemplate] {
    &TEMPLATES
}

/// Looks up a template by its user-facing label (case-sensitive).
pub fn by_label(label: &str) -> Option<&'static DriverTemplate> {
    TEMPLATES.iter().find(|template| template.label == label)
}

/// Looks up the first template using a driver identifier.
pub fn by_driver(driver: &str) -> Option<&'static DriverTemplate> {
    TEMPLATES.iter().find(|template| template.driver == driver)
}

struct TemplateTable;

impl Serialize for TemplateTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(TEMPLATES.len()))?;
        for template in &TEMPLATES {
            map.serialize_entry(template.label, template)?;
        }
        map.end()
    }
}

/// The whole table as a JSON object `{label: {driver, fields}}`, in display order.
pub fn to_json() -> String {
    serde_json::to_string(&TemplateTable).unwrap_or_default()
}
