use std::rc::Rc;

/// ## Executable token set
///
/// A tokenized line is a sequence of these. Tokens that the original
/// encodes as self-modifying bytecode (line references, PROC/FN call
/// sites, block IF offsets, CASE jump tables) appear here as paired
/// unresolved/resolved variants; the resolver rewrites the token in
/// place the first time it is executed.
///
/// Addresses are indices into the flattened token stream of the whole
/// program.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// End of a line's executable tokens.
    Eol,
    /// End of the main program, of a library, or of a direct command.
    EndProg,
    Colon,
    Comma,
    Semicolon,
    /// PRINT line separator.
    Apostrophe,
    LParen,
    RParen,
    /// Start of an assembler block. Recognized, never supported.
    LBracket,

    IntLit(i64),
    FloatLit(f64),
    StrLit(Rc<str>),

    /// Scalar or array reference; array names keep their trailing `(`.
    Var(Rc<str>),
    /// Static integer slot: 1..=26 for `A%..Z%`, 27 for `@%`.
    Static(u8),

    /// PROC/FN reference, unresolved: the name with its PROC/FN prefix.
    Call(Rc<str>),
    /// PROC/FN reference resolved to a symbol table record.
    CallIdx(Rc<str>, usize),

    /// Line number operand, unresolved (follows GOTO/GOSUB/RESTORE/THEN).
    LineNum(u16),
    /// Line number operand resolved to a token address.
    LineAddr(usize),

    /// IF not yet classified as single-line or block.
    If,
    SingleIf,
    /// Block IF with (then-target, else-target) addresses.
    BlockIf(usize, usize),
    Else,
    /// ELSE with the address of the statement after the matching ENDIF
    /// (or after the end of a single-line IF).
    ElseJump(usize),
    Case,
    /// CASE resolved to an entry in the program's case table arena.
    CaseTable(usize),
    When,
    WhenJump(usize),
    Otherwise,
    OtherwiseJump(usize),

    /// DATA statement; the raw field text is kept verbatim.
    Data(Rc<str>),
    /// A `*command` line, passed to the host shell.
    OsCmd(Rc<str>),

    Word(Word),
    Func(Func),
    Operator(Operator),
}

impl Token {
    /// The "at end of statement" predicate: `:`/end-of-line plus the
    /// tokens that close an IF arm or a CASE arm.
    pub fn at_eos(&self) -> bool {
        matches!(
            self,
            Token::Eol
                | Token::EndProg
                | Token::Colon
                | Token::Else
                | Token::ElseJump(_)
                | Token::When
                | Token::WhenJump(_)
                | Token::Otherwise
                | Token::OtherwiseJump(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Word {
    Clear,
    Def,
    Dim,
    End,
    Endcase,
    Endif,
    Endproc,
    Endwhile,
    Error,
    For,
    Gosub,
    Goto,
    Himem,
    Input,
    Let,
    Library,
    Line,
    Local,
    Lomem,
    Next,
    Of,
    Off,
    On,
    Oscli,
    Page,
    Print,
    Quit,
    Read,
    Rem,
    Repeat,
    Report,
    Restore,
    Return,
    Run,
    Spc,
    Step,
    Stop,
    Swap,
    Tab,
    Then,
    To,
    Top,
    Trace,
    Until,
    Wait,
    While,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Func {
    Abs,
    Acs,
    Asc,
    Asn,
    Atn,
    Chr,
    Cos,
    Count,
    Deg,
    Erl,
    Err,
    Exp,
    Instr,
    Int,
    Left,
    Len,
    Ln,
    Log,
    Mid,
    Pi,
    Rad,
    ReportS,
    Right,
    Rnd,
    Sgn,
    Sin,
    Sqr,
    Str,
    StringS,
    Tan,
    Time,
    TimeS,
    Val,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Caret,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Shl,
    Shr,
    Shru,
    PlusEq,
    MinusEq,
    And,
    Or,
    Eor,
    Div,
    Mod,
    Not,
    /// `?` byte indirection.
    Query,
    /// `!` 32-bit indirection.
    Pling,
    /// `]` 64-bit indirection.
    Long,
    /// `|` float indirection.
    Bar,
    /// `$` string indirection.
    Dollar,
    /// `~` hexadecimal print formatting.
    Tilde,
}

/// Keyword tables. Keywords are recognized in upper case only, the way
/// the original tokenizer works; lower case runs always lex as names.
impl Word {
    pub fn lookup(s: &str) -> Option<Word> {
        use Word::*;
        Some(match s {
            "CLEAR" => Clear,
            "DEF" => Def,
            "DIM" => Dim,
            "END" => End,
            "ENDCASE" => Endcase,
            "ENDIF" => Endif,
            "ENDPROC" => Endproc,
            "ENDWHILE" => Endwhile,
            "ERROR" => Error,
            "FOR" => For,
            "GOSUB" => Gosub,
            "GOTO" => Goto,
            "HIMEM" => Himem,
            "INPUT" => Input,
            "LET" => Let,
            "LIBRARY" => Library,
            "LINE" => Line,
            "LOCAL" => Local,
            "LOMEM" => Lomem,
            "NEXT" => Next,
            "OF" => Of,
            "OFF" => Off,
            "ON" => On,
            "OSCLI" => Oscli,
            "PAGE" => Page,
            "PRINT" => Print,
            "QUIT" => Quit,
            "READ" => Read,
            "REM" => Rem,
            "REPEAT" => Repeat,
            "REPORT" => Report,
            "RESTORE" => Restore,
            "RETURN" => Return,
            "RUN" => Run,
            "SPC" => Spc,
            "STEP" => Step,
            "STOP" => Stop,
            "SWAP" => Swap,
            "TAB" => Tab,
            "THEN" => Then,
            "TO" => To,
            "TOP" => Top,
            "TRACE" => Trace,
            "UNTIL" => Until,
            "WAIT" => Wait,
            "WHILE" => While,
            _ => return None,
        })
    }
}

impl Func {
    pub fn lookup(s: &str) -> Option<Func> {
        use Func::*;
        Some(match s {
            "ABS" => Abs,
            "ACS" => Acs,
            "ASC" => Asc,
            "ASN" => Asn,
            "ATN" => Atn,
            "CHR$" => Chr,
            "COS" => Cos,
            "COUNT" => Count,
            "DEG" => Deg,
            "ERL" => Erl,
            "ERR" => Err,
            "EXP" => Exp,
            "INSTR(" => Instr,
            "INT" => Int,
            "LEFT$(" => Left,
            "LEN" => Len,
            "LN" => Ln,
            "LOG" => Log,
            "MID$(" => Mid,
            "PI" => Pi,
            "RAD" => Rad,
            "REPORT$" => ReportS,
            "RIGHT$(" => Right,
            "RND" => Rnd,
            "SGN" => Sgn,
            "SIN" => Sin,
            "SQR" => Sqr,
            "STR$" => Str,
            "STRING$(" => StringS,
            "TAN" => Tan,
            "TIME$" => TimeS,
            "TIME" => Time,
            "VAL" => Val,
            _ => return None,
        })
    }
}

impl Operator {
    pub fn word_lookup(s: &str) -> Option<Operator> {
        use Operator::*;
        Some(match s {
            "AND" => And,
            "OR" => Or,
            "EOR" => Eor,
            "DIV" => Div,
            "MOD" => Mod,
            "NOT" => Not,
            _ => return None,
        })
    }
}
