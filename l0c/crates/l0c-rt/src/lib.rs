//! l0c-rt - The trusted C99 runtime the emitted code links against.
//!
//! The runtime is a single header, `l0_runtime.h`, embedded here as an
//! asset. The backend emits `#include "l0_runtime.h"` (after any trace
//! defines) and the driver writes the header next to the generated C file
//! so the host C compiler can find it.
//!
//! The header provides: the core typedefs (`l0_int`, `l0_byte`, `l0_bool`,
//! `l0_string` with static/heap tagging and sentinel refcounts), checked
//! arithmetic and narrowing helpers, ARC retain/release, optional wrappers
//! plus the `L0_DEFINE_OPT` macro, the `new`/`drop` allocation tracker,
//! whole-file/line/print I/O, SipHash-1-3 hashing with type-tag prefixes,
//! argv access, and the `[l0][arc]` / `[l0][mem]` tracing macros.

/// File name the emitted translation unit includes.
pub const RUNTIME_HEADER_NAME: &str = "l0_runtime.h";

/// Full text of the runtime header.
pub const RUNTIME_HEADER: &str = include_str!("l0_runtime.h");

/// Names the backend is allowed to reference. Kept as a list so the
/// emitted-call surface is checkable in one place.
pub const RUNTIME_API: &[&str] = &[
    // typedefs and constants
    "l0_int",
    "l0_byte",
    "l0_bool",
    "l0_string",
    "L0_TRUE",
    "L0_FALSE",
    "L0_EMPTY_STRING",
    "L0_STRING_CONST",
    "L0_DEFINE_OPT",
    "l0_opt_int",
    "l0_opt_byte",
    "l0_opt_bool",
    "l0_opt_string",
    // checked arithmetic
    "_rt_iadd",
    "_rt_isub",
    "_rt_imul",
    "_rt_idiv",
    "_rt_imod",
    "_rt_bdiv",
    "_rt_bmod",
    "_rt_shl",
    "_rt_shr",
    "_rt_narrow_byte",
    "_rt_unwrap_check",
    // ARC
    "rt_string_retain",
    "rt_string_release",
    "rt_string_concat",
    "rt_string_eq",
    // object tracker
    "_rt_alloc_obj",
    "_rt_drop",
    // entry plumbing
    "_rt_init_args",
];

/// Returns the runtime header text.
pub fn runtime_header() -> &'static str {
    RUNTIME_HEADER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_defines_every_api_name() {
        for name in RUNTIME_API {
            assert!(
                RUNTIME_HEADER.contains(name),
                "runtime header is missing `{}`",
                name
            );
        }
    }

    #[test]
    fn test_typedef_contract() {
        assert!(RUNTIME_HEADER.contains("typedef int32_t l0_int;"));
        assert!(RUNTIME_HEADER.contains("typedef uint8_t l0_byte;"));
        assert!(RUNTIME_HEADER.contains("typedef uint8_t l0_bool;"));
        assert!(RUNTIME_HEADER.contains("typedef l0_str *l0_string;"));
    }

    #[test]
    fn test_refcount_sentinels_present() {
        assert!(RUNTIME_HEADER.contains("L0_RC_STATIC"));
        assert!(RUNTIME_HEADER.contains("L0_RC_FREED"));
        assert!(RUNTIME_HEADER.contains("panic-double-release"));
        assert!(RUNTIME_HEADER.contains("panic-rc-overflow"));
    }

    #[test]
    fn test_trace_macros_are_gated() {
        assert!(RUNTIME_HEADER.contains("#if L0_TRACE_ARC"));
        assert!(RUNTIME_HEADER.contains("#if L0_TRACE_MEMORY"));
        assert!(RUNTIME_HEADER.contains("[l0][arc]"));
        assert!(RUNTIME_HEADER.contains("[l0][mem]"));
        // Stable field names of the wire format.
        for field in ["op=", "kind=", "ptr=", "rc_before=", "rc_after=", "action="] {
            assert!(
                RUNTIME_HEADER.contains(field),
                "trace format is missing `{}`",
                field
            );
        }
    }

    #[test]
    fn test_checked_arithmetic_panics_listed() {
        assert!(RUNTIME_HEADER.contains("division by zero"));
        assert!(RUNTIME_HEADER.contains("shift distance out of range"));
        assert!(RUNTIME_HEADER.contains("drop of an unregistered pointer"));
        assert!(RUNTIME_HEADER.contains("unwrap of null value"));
    }

    #[test]
    fn test_siphash_is_one_three() {
        // One compression round per block, three finalization rounds.
        assert!(RUNTIME_HEADER.contains("SipHash-1-3"));
        assert!(RUNTIME_HEADER.contains("l0_hash_key[16]"));
    }

    #[test]
    fn test_header_guard() {
        assert!(RUNTIME_HEADER.starts_with("/* l0_runtime.h"));
        assert!(RUNTIME_HEADER.contains("#ifndef L0_RUNTIME_H"));
        assert!(RUNTIME_HEADER.contains("#endif /* L0_RUNTIME_H */"));
    }
}
