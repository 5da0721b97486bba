/*!
# Introduction to Beeb BASIC

Beeb BASIC is an interpreter for the BBC BASIC V/VI dialect, the
structured BASIC of the Acorn Archimedes era. Programs are numbered
lines, but the language grew well past its 1978 roots: procedures and
functions with parameters, multi-line IF and CASE, WHILE and REPEAT
loops, error trapping, and direct access to a flat byte workspace
through indirection operators.

Start the interpreter and you are at the prompt:

<pre><code>&nbsp;  Beeb BASIC VI
&nbsp;> █
</code></pre>

A statement typed without a line number executes immediately:

<pre><code>&nbsp;> PRINT "Hello World"
&nbsp;  Hello World
</code></pre>

A statement with a line number is stored in the program. Line numbers
order the program and are the targets of `GOTO`, `GOSUB` and `RESTORE`.
Entering a bare line number deletes that line.

<pre><code>&nbsp;> 10 FOR I%=1 TO 3
&nbsp;> 20 PRINT "Hello again"
&nbsp;> 30 NEXT
&nbsp;> RUN
&nbsp;  Hello again
&nbsp;  Hello again
&nbsp;  Hello again
</code></pre>

## Variables

A variable's name ends with a type suffix: `%` for a 32-bit integer,
`%%` for a 64-bit integer, `&` for an unsigned byte, `$` for a string,
and nothing (or `#`) for a floating point value. `A%` to `Z%` are the
resident static integers: they live for the whole session and survive
`RUN`, `NEW`-style edits, and `CLEAR`. `@%` controls numeric print
formatting.

Arrays are declared with `DIM a%(10)` and may have several dimensions.
`DIM block% 255` instead reserves 256 raw bytes of the workspace and
puts their address in `block%`; the indirection operators `?` (byte),
`!` (32-bit word), `]` (64-bit word), `|` (float) and `$` (string) read
and write such memory directly.

## Procedures and functions

`DEF PROCname(parameters)` to `ENDPROC` defines a procedure, called as
`PROCname(...)`. `DEF FNname(parameters)` defines a function whose body
ends with `=result`. Parameters are passed by value unless declared
`RETURN`, which copies the final value back to the caller's variable.
`LOCAL` shields variables inside a definition. Definitions are found
wherever they appear in the program, or in libraries loaded with
`LIBRARY "file"`.

Stop a running program with the interrupt key; trap failures with
`ON ERROR`. Leave with `QUIT`.
*/
