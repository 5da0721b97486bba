/*!
# Statement reference

The statements the interpreter executes, in brief. Square brackets mark
optional parts.

## Assignment

<pre><code>&nbsp;  [LET] variable = expression
&nbsp;  variable += expression
&nbsp;  variable -= expression
</code></pre>

The target may be a scalar, an array element, a whole array (`a()=0`
fills it), an indirection (`?addr`, `!addr`, `]addr`, `|addr`, `$addr`,
`var?offset`, `var!offset`), or one of the pseudo-variables `TIME`,
`HIMEM`, `LOMEM`.

## Flow

<pre><code>&nbsp;  IF expr [THEN] statements [ELSE statements]
&nbsp;  IF expr THEN                 (block form: THEN ends the line)
&nbsp;    statements
&nbsp;  [ELSE
&nbsp;    statements]
&nbsp;  ENDIF
&nbsp;  CASE expr OF
&nbsp;  WHEN value [,value]... : statements
&nbsp;  [OTHERWISE statements]
&nbsp;  ENDCASE
&nbsp;  FOR var = first TO last [STEP inc] ... NEXT [var[,var]...]
&nbsp;  REPEAT ... UNTIL expr
&nbsp;  WHILE expr ... ENDWHILE
&nbsp;  GOTO line
&nbsp;  GOSUB line ... RETURN
&nbsp;  ON expr GOTO|GOSUB|PROC... list [ELSE statements]
&nbsp;  END, STOP, QUIT [code]
</code></pre>

A `FOR` loop's body always runs once; the test happens at `NEXT`. A
`STEP` of zero is Silly. `ENDWHILE` silently abandons unterminated
loops opened inside its body, as Acorn's interpreter always has.

## Procedures, functions, scope

<pre><code>&nbsp;  DEF PROCname[(parm[,parm]...)] ... ENDPROC
&nbsp;  DEF FNname[(parm[,parm]...)] ... =result
&nbsp;  PROCname[(arguments)]
&nbsp;  LOCAL var[,var]...
&nbsp;  LOCAL ERROR, LOCAL DATA
&nbsp;  LIBRARY "file"
</code></pre>

A parameter declared `RETURN` copies its final value back to the
argument, which must itself be assignable. A library is a separate
tokenized file searched for definitions after the program; its
`LIBRARY LOCAL` line declares variables private to the library.

## Data and input

<pre><code>&nbsp;  DATA field [,field]...
&nbsp;  READ var [,var]...
&nbsp;  RESTORE [line], RESTORE DATA, RESTORE ERROR, RESTORE LOCAL
&nbsp;  INPUT ["prompt"] var [,var]...
&nbsp;  INPUT LINE var$
</code></pre>

Numeric `READ` and `INPUT` fields are full expressions. Quoted DATA
strings double their inner quotes.

## Errors

<pre><code>&nbsp;  ON ERROR statements
&nbsp;  ON ERROR LOCAL statements
&nbsp;  ON ERROR OFF
&nbsp;  ERROR number, "text"
&nbsp;  REPORT
</code></pre>

`ON ERROR` replaces the program-wide handler; `ON ERROR LOCAL` stacks a
handler that lasts until the enclosing procedure returns or a
`RESTORE ERROR` pops it. `ERR`, `ERL` and `REPORT$` expose the last
error's number, line and text.

## Memory and the host

<pre><code>&nbsp;  DIM a(bounds[,bounds]...)
&nbsp;  DIM var size
&nbsp;  DIM HIMEM var size          (release with size -1)
&nbsp;  CLEAR, CLEAR HIMEM
&nbsp;  SWAP a, b
&nbsp;  OSCLI "command", *command
&nbsp;  WAIT [centiseconds]
&nbsp;  PRINT items, TAB(n), SPC n, ~ for hexadecimal
</code></pre>
*/
