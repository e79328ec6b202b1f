/// Error code registry for gridquery
///
/// Error codes are organized by category:
/// - 1000-1999: Argument (caller contract) errors
/// - 2000-2999: Value coercion errors
/// - 3000-3999: Request shape errors
/// - 4000-4999: Configuration errors
/// - 5000-5999: Record access errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Argument errors (1000-1999)
    pub const ARGUMENT_GENERIC: u16 = 1000;
    pub const ARGUMENT_NULL: u16 = 1001;
    pub const ARGUMENT_INVALID: u16 = 1002;

    // Coercion errors (2000-2999)
    pub const COERCION_GENERIC: u16 = 2000;
    pub const COERCION_GUID: u16 = 2001;
    pub const COERCION_DATE: u16 = 2002;
    pub const COERCION_ENUM: u16 = 2003;
    pub const COERCION_NUMERIC: u16 = 2004;
    pub const COERCION_BOOL: u16 = 2005;
    pub const COERCION_UNSUPPORTED: u16 = 2006;

    // Request errors (3000-3999)
    pub const REQUEST_GENERIC: u16 = 3000;
    pub const REQUEST_UNKNOWN_OPERATOR: u16 = 3001;
    pub const REQUEST_UNKNOWN_JOINER: u16 = 3002;
    pub const REQUEST_UNKNOWN_DIRECTION: u16 = 3003;
    pub const REQUEST_MALFORMED_CLAUSE: u16 = 3004;
    pub const REQUEST_INVALID_PAGING: u16 = 3005;
    pub const REQUEST_PARSE_ERROR: u16 = 3006;

    // Configuration errors (4000-4999)
    pub const CONFIG_GENERIC: u16 = 4000;
    pub const CONFIG_NOT_FOUND: u16 = 4001;
    pub const CONFIG_PARSE_ERROR: u16 = 4002;
    pub const CONFIG_INVALID_VALUE: u16 = 4003;

    // Access errors (5000-5999)
    pub const ACCESS_GENERIC: u16 = 5000;
    pub const ACCESS_NO_SUCH_MEMBER: u16 = 5001;
    pub const ACCESS_READ_ONLY: u16 = 5002;
    pub const ACCESS_TYPE_MISMATCH: u16 = 5003;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Argument errors
        1000 => "Invalid argument",
        1001 => "Required argument was null",
        1002 => "Argument has an unsupported shape",

        // Coercion errors
        2000 => "Value could not be coerced",
        2001 => "Malformed GUID literal",
        2002 => "Malformed date or date-offset literal",
        2003 => "Value does not name an enum member",
        2004 => "Malformed or out-of-range numeric literal",
        2005 => "Malformed boolean literal",
        2006 => "Target type does not accept literal values",

        // Request errors
        3000 => "Invalid query request",
        3001 => "Unknown filter operator",
        3002 => "Unknown clause joiner",
        3003 => "Unknown sort direction",
        3004 => "Filter clause populates neither or both of operator and predicates",
        3005 => "Invalid skip/take paging",
        3006 => "Failed to parse query request",

        // Configuration errors
        4000 => "Generic configuration error",
        4001 => "Configuration file not found",
        4002 => "Failed to parse configuration",
        4003 => "Invalid value in configuration",

        // Access errors
        5000 => "Record access failed",
        5001 => "Record has no such member",
        5002 => "Record member is read-only",
        5003 => "Value does not fit the member type",

        9000 => "Unexpected error",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_descriptions() {
        assert_eq!(
            describe_error_code(ErrorCode::ARGUMENT_NULL),
            "Required argument was null"
        );
        assert_eq!(describe_error_code(ErrorCode::COERCION_GUID), "Malformed GUID literal");
        assert_eq!(describe_error_code(65535), "Unknown error code");
    }

    #[test]
    fn test_error_code_ranges() {
        assert!((1000..2000).contains(&ErrorCode::ARGUMENT_INVALID));
        assert!((2000..3000).contains(&ErrorCode::COERCION_UNSUPPORTED));
        assert!((3000..4000).contains(&ErrorCode::REQUEST_PARSE_ERROR));
        assert!((4000..5000).contains(&ErrorCode::CONFIG_INVALID_VALUE));
        assert!((5000..6000).contains(&ErrorCode::ACCESS_TYPE_MISMATCH));
    }
}
