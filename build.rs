fn main() {
    // pcsc-sys locates libpcsclite through pkg-config, which refuses to run
    // when cross-compiling (e.g. to musl) unless explicitly allowed.
    std::env::set_var("PKG_CONFIG_ALLOW_CROSS", "1");

    napi_build::setup();
}
