//! Static field schema and per-kind validators.

use serde_json::Value;

use super::ValidationMode;

/// Inventory field names.
pub mod fields {
    pub const BOOT_TIME: &str = "Boot Time";
    pub const CPU_PHYSICAL_CORES: &str = "CPU Physical Cores";
    pub const CPU_TYPE: &str = "CPU Type";
    pub const CPU_VIRTUALIZATION: &str = "CPU Virtualization";
    pub const CPU_TOTAL_CORES: &str = "CPU Total Cores";
    pub const DATACENTER_NAME: &str = "Datacenter Name";
    pub const DISKS: &str = "Disks";
    pub const HOSTNAME: &str = "Hostname";
    pub const HW_FAMILY: &str = "HW Family";
    pub const HW_VERSION: &str = "HW Version";
    pub const LINK_AGGREGATIONS: &str = "Link Aggregations";
    pub const LIVE_IMAGE: &str = "Live Image";
    pub const MAC_ADDRESS: &str = "MAC Address";
    pub const MANUFACTURER: &str = "Manufacturer";
    pub const MIB_OF_MEMORY: &str = "MiB of Memory";
    pub const NETWORK_INTERFACES: &str = "Network Interfaces";
    pub const PRODUCT: &str = "Product";
    pub const SDC_VERSION: &str = "SDC Version";
    pub const SERIAL_NUMBER: &str = "Serial Number";
    pub const SKU_NUMBER: &str = "SKU Number";
    pub const SYSTEM_TYPE: &str = "System Type";
    pub const UUID: &str = "UUID";
    pub const VIRTUAL_NETWORK_INTERFACES: &str = "Virtual Network Interfaces";
    pub const VM_CAPABLE: &str = "VM Capable";
}

/// Structured fields whose contents are only checked in strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    /// Device name to disk description.
    Disks,
    /// Interface name to NIC description.
    NetworkInterfaces,
    /// VNIC name to VNIC description.
    VirtualNetworkInterfaces,
    /// Aggregation name to aggregation description.
    LinkAggregations,
}

/// How a field's value is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorKind {
    /// Canonical lowercase hyphenated UUID.
    Uuid,
    /// Number or numeric string with no fractional part.
    Integer,
    /// Build stamp such as `20150101T000000Z`.
    PlatformStamp,
    /// `<digits>.<digits>`.
    SdcVersion,
    /// Alphanumerics, space, `.`, `,`, `-`, `_`.
    SimpleString,
    /// Single DNS label.
    Hostname,
    /// The literal `SunOS`.
    SunOs,
    /// JSON boolean.
    Boolean,
    /// Nested mapping.
    Composite(CompositeKind),
}

impl ValidatorKind {
    /// Check a value. Total: any JSON value yields a verdict.
    pub fn accepts(&self, value: &Value, mode: ValidationMode) -> bool {
        match self {
            Self::Uuid => value.as_str().is_some_and(mockcn_id::is_uuid),
            Self::Integer => is_integer(value),
            Self::PlatformStamp => value.as_str().is_some_and(is_platform_stamp),
            Self::SdcVersion => value.as_str().is_some_and(is_sdc_version),
            Self::SimpleString => value.as_str().is_some_and(is_simple_string),
            Self::Hostname => value.as_str().is_some_and(is_hostname),
            Self::SunOs => value.as_str() == Some("SunOS"),
            Self::Boolean => value.is_boolean(),
            Self::Composite(_) => match mode {
                ValidationMode::Lenient => true,
                ValidationMode::Strict => is_map_of_maps(value),
            },
        }
    }
}

/// One schema entry.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: ValidatorKind,
    pub optional: bool,
}

const fn required(name: &'static str, kind: ValidatorKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        optional: false,
    }
}

const fn optional(name: &'static str, kind: ValidatorKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        optional: true,
    }
}

/// Every field a client may set.
pub static FIELD_SCHEMA: &[FieldSpec] = &[
    required(fields::BOOT_TIME, ValidatorKind::Integer),
    required(fields::CPU_PHYSICAL_CORES, ValidatorKind::Integer),
    required(fields::CPU_TYPE, ValidatorKind::SimpleString),
    required(fields::CPU_VIRTUALIZATION, ValidatorKind::SimpleString),
    required(fields::CPU_TOTAL_CORES, ValidatorKind::Integer),
    required(fields::DISKS, ValidatorKind::Composite(CompositeKind::Disks)),
    required(fields::HOSTNAME, ValidatorKind::Hostname),
    optional(fields::HW_FAMILY, ValidatorKind::SimpleString),
    optional(fields::HW_VERSION, ValidatorKind::SimpleString),
    required(
        fields::LINK_AGGREGATIONS,
        ValidatorKind::Composite(CompositeKind::LinkAggregations),
    ),
    required(fields::LIVE_IMAGE, ValidatorKind::PlatformStamp),
    required(fields::MANUFACTURER, ValidatorKind::SimpleString),
    // Profiles carry this as a number even though sysinfo reports a string.
    required(fields::MIB_OF_MEMORY, ValidatorKind::Integer),
    required(
        fields::NETWORK_INTERFACES,
        ValidatorKind::Composite(CompositeKind::NetworkInterfaces),
    ),
    required(fields::PRODUCT, ValidatorKind::SimpleString),
    required(fields::SDC_VERSION, ValidatorKind::SdcVersion),
    required(fields::SERIAL_NUMBER, ValidatorKind::SimpleString),
    required(fields::SKU_NUMBER, ValidatorKind::SimpleString),
    required(fields::SYSTEM_TYPE, ValidatorKind::SunOs),
    required(fields::UUID, ValidatorKind::Uuid),
    required(
        fields::VIRTUAL_NETWORK_INTERFACES,
        ValidatorKind::Composite(CompositeKind::VirtualNetworkInterfaces),
    ),
    required(fields::VM_CAPABLE, ValidatorKind::Boolean),
];

/// Look up the schema entry for a field name.
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELD_SCHEMA.iter().find(|spec| spec.name == name)
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty()
                && s.parse::<f64>()
                    .is_ok_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn is_platform_stamp(s: &str) -> bool {
    let Some(body) = s.strip_suffix('Z') else {
        return false;
    };
    let Some((date, time)) = body.split_once('T') else {
        return false;
    };
    all_digits(date) && all_digits(time)
}

fn is_sdc_version(s: &str) -> bool {
    let Some((major, minor)) = s.split_once('.') else {
        return false;
    };
    all_digits(major) && all_digits(minor)
}

fn is_simple_string(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | ',' | '-' | '_'))
}

fn is_hostname(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 63
        && !s.starts_with('-')
        && !s.ends_with('-')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_map_of_maps(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.values().all(Value::is_object))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn lenient(kind: ValidatorKind, value: Value) -> bool {
        kind.accepts(&value, ValidationMode::Lenient)
    }

    #[rstest]
    #[case(json!(16), true)]
    #[case(json!(16.0), true)]
    #[case(json!(-3), true)]
    #[case(json!("1420070400"), true)]
    #[case(json!(" 42 "), true)]
    #[case(json!(1.5), false)]
    #[case(json!("1.5"), false)]
    #[case(json!(""), false)]
    #[case(json!("twelve"), false)]
    #[case(json!("Infinity"), false)]
    #[case(json!(true), false)]
    #[case(json!(null), false)]
    #[case(json!({}), false)]
    fn test_integer(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(lenient(ValidatorKind::Integer, value), expected);
    }

    #[rstest]
    #[case("20150101T000000Z", true)]
    #[case("TZ", true)]
    #[case("20150101T000000", false)]
    #[case("2015-01-01T00:00:00Z", false)]
    #[case("20150101TT1Z", false)]
    fn test_platform_stamp(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(lenient(ValidatorKind::PlatformStamp, json!(value)), expected);
    }

    #[rstest]
    #[case("7.0", true)]
    #[case("10.12", true)]
    #[case("7", false)]
    #[case("7.0.1", false)]
    #[case("v7.0", false)]
    fn test_sdc_version(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(lenient(ValidatorKind::SdcVersion, json!(value)), expected);
    }

    #[rstest]
    #[case("Intel(R) Xeon(R)", false)]
    #[case("Joyent-Compute Platform 1.0", true)]
    #[case("S12, rev_2.1", true)]
    #[case("", true)]
    #[case("semi;colon", false)]
    fn test_simple_string(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(lenient(ValidatorKind::SimpleString, json!(value)), expected);
    }

    #[rstest]
    #[case("abc", true)]
    #[case("cn-01", true)]
    #[case("a", true)]
    #[case("", false)]
    #[case("-cn", false)]
    #[case("cn.example.com", false)]
    #[case("has space", false)]
    fn test_hostname(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(lenient(ValidatorKind::Hostname, json!(value)), expected);
    }

    #[test]
    fn test_string_kinds_reject_non_strings() {
        for kind in [
            ValidatorKind::Uuid,
            ValidatorKind::PlatformStamp,
            ValidatorKind::SdcVersion,
            ValidatorKind::SimpleString,
            ValidatorKind::Hostname,
            ValidatorKind::SunOs,
        ] {
            assert!(!lenient(kind, json!(7)), "{kind:?} accepted a number");
            assert!(!lenient(kind, json!(null)), "{kind:?} accepted null");
            assert!(!lenient(kind, json!(["x"])), "{kind:?} accepted an array");
        }
    }

    #[test]
    fn test_sunos_and_boolean() {
        assert!(lenient(ValidatorKind::SunOs, json!("SunOS")));
        assert!(!lenient(ValidatorKind::SunOs, json!("Linux")));
        assert!(lenient(ValidatorKind::Boolean, json!(false)));
        assert!(!lenient(ValidatorKind::Boolean, json!("true")));
    }

    #[test]
    fn test_composite_modes() {
        let kind = ValidatorKind::Composite(CompositeKind::NetworkInterfaces);
        let nics = json!({"e1000g0": {"Link Status": "up"}});

        assert!(kind.accepts(&json!("anything"), ValidationMode::Lenient));
        assert!(kind.accepts(&nics, ValidationMode::Strict));
        assert!(kind.accepts(&json!({}), ValidationMode::Strict));
        assert!(!kind.accepts(&json!("anything"), ValidationMode::Strict));
        assert!(!kind.accepts(&json!({"e1000g0": 1}), ValidationMode::Strict));
    }

    #[test]
    fn test_schema_lookup() {
        assert_eq!(field_spec("UUID").map(|s| s.kind), Some(ValidatorKind::Uuid));
        assert!(field_spec("HW Family").is_some_and(|s| s.optional));
        assert!(field_spec("Datacenter Name").is_none());
        assert!(field_spec("uuid").is_none());
    }
}
