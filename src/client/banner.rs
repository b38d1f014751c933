//! Greeting shown by `help` and `info`.

/// Returns the banner text, ending in a newline.
#[must_use]
pub fn banner() -> String {
    format!(
        concat!(
            "\x1b[35m        .  *  .\n",
            "     *   \\|/   *\n",
            "   .  --  *  --  .\n",
            "     *   /|\\   *\x1b[0m\n",
            "\n",
            "the great and powerful Trixie! (v{})\n",
            "... is here to help :)\n",
        ),
        env!("CARGO_PKG_VERSION")
    )
}
