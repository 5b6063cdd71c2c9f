//! Text attributes applied to subsequent output on a surface.

use bitflags::bitflags;

bitflags! {
    /// Character attributes.
    ///
    /// These can be combined using bitwise OR. The empty set is
    /// [`Attributes::NORMAL`].
    ///
    /// # Example
    /// ```
    /// use termbus::Attributes;
    /// let style = Attributes::BOLD | Attributes::ITALIC;
    /// assert!(style.contains(Attributes::BOLD));
    /// ```
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attributes: u16 {
        /// Bold text
        const BOLD = 0b0000_0000_0001;
        /// Dim/faint text
        const DIM = 0b0000_0000_0010;
        /// Italic text
        const ITALIC = 0b0000_0000_0100;
        /// Underlined text
        const UNDERLINE = 0b0000_0000_1000;
        /// Blinking text
        const BLINK = 0b0000_0001_0000;
        /// Reversed colors (fg/bg swapped)
        const REVERSE = 0b0000_0010_0000;
        /// Hidden/invisible text
        const INVISIBLE = 0b0000_0100_0000;
        /// Highlighted text, the terminal's best emphasis
        const STANDOUT = 0b0000_1000_0000;
        /// Protected text
        const PROTECT = 0b0001_0000_0000;
        /// Alternate character set
        const ALTCHARSET = 0b0010_0000_0000;
    }
}

impl Attributes {
    /// Plain text, no attribute set.
    pub const NORMAL: Self = Self::empty();
}

impl std::fmt::Debug for Attributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("NORMAL");
        }
        bitflags::parser::to_writer(self, f)
    }
}
