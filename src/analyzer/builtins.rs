/// The ECMAScript standard library surface. Reads of these are not worth
/// reporting; writes still are. `eval` is deliberately absent.
pub const ECMA_GLOBALS: &[&str] = &[
    "AggregateError",
    "Array",
    "ArrayBuffer",
    "Atomics",
    "BigInt",
    "BigInt64Array",
    "BigUint64Array",
    "Boolean",
    "DataView",
    "Date",
    "Error",
    "EvalError",
    "FinalizationRegistry",
    "Float16Array",
    "Float32Array",
    "Float64Array",
    "Function",
    "Infinity",
    "Int16Array",
    "Int32Array",
    "Int8Array",
    "Intl",
    "Iterator",
    "JSON",
    "Map",
    "Math",
    "NaN",
    "Number",
    "Object",
    "Promise",
    "Proxy",
    "RangeError",
    "ReferenceError",
    "Reflect",
    "RegExp",
    "Set",
    "SharedArrayBuffer",
    "String",
    "Symbol",
    "SyntaxError",
    "TypeError",
    "Uint16Array",
    "Uint32Array",
    "Uint8Array",
    "Uint8ClampedArray",
    "URIError",
    "WeakMap",
    "WeakRef",
    "WeakSet",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "escape",
    "globalThis",
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "undefined",
    "unescape",
];

/// Names that evaluate to the global object itself.
pub const GLOBAL_ALIASES: &[&str] = &["globalThis", "self", "window"];

/// webpack's runtime exposes the global object as `__webpack_require__.g`.
pub const BUNDLER_GLOBAL: [&str; 2] = ["__webpack_require__", "g"];

/// Bound implicitly in every non-arrow function.
pub const IMPLICIT_ARGUMENTS: &str = "arguments";

pub fn is_ecma_global(name: &str) -> bool {
    ECMA_GLOBALS.contains(&name)
}

pub fn is_global_alias(name: &str) -> bool {
    GLOBAL_ALIASES.contains(&name)
}
